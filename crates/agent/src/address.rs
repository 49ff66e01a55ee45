// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use tokio_tungstenite::tungstenite::http::Uri;

use crate::error::AgentError;

/// A validated relay address.
///
/// Users enter the relay's HTTP base (`http://host:port`); the push channel
/// lives at `ws://host:port/ws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    base: String,
    ws_url: String,
}

impl ServerAddress {
    pub fn parse(input: &str) -> Result<Self, AgentError> {
        let base = input.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(AgentError::InvalidAddress("address is empty".to_owned()));
        }

        let uri: Uri = base.parse().map_err(|e| AgentError::InvalidAddress(format!("{base}: {e}")))?;
        let scheme = uri.scheme_str().map(str::to_ascii_lowercase);
        match scheme.as_deref() {
            Some("http") | Some("ws") => {}
            Some("https") | Some("wss") => {
                return Err(AgentError::InvalidAddress(format!(
                    "{base}: TLS endpoints are not supported, use http:// or ws://"
                )));
            }
            Some(other) => {
                return Err(AgentError::InvalidAddress(format!("{base}: unsupported scheme {other}")));
            }
            None => {
                return Err(AgentError::InvalidAddress(format!(
                    "{base}: expected scheme://host:port"
                )));
            }
        }
        let authority = match uri.authority() {
            Some(a) if !a.host().is_empty() => a,
            _ => return Err(AgentError::InvalidAddress(format!("{base}: missing host"))),
        };
        if uri.query().is_some() {
            return Err(AgentError::InvalidAddress(format!("{base}: query strings are not allowed")));
        }

        let path = uri.path().trim_end_matches('/');
        let ws_url = format!("ws://{authority}{path}/ws");
        Ok(Self { base: base.to_owned(), ws_url })
    }

    /// The address as the user entered it, without a trailing slash.
    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// Push-channel URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
