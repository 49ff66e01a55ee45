// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frames pushed by the relay and display resolution for notifications.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Title shown when the payload carries none.
pub const FALLBACK_TITLE: &str = "New notification";

/// One pushed event, exactly as the producer posted it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Notification {
    payload: Map<String, Value>,
}

impl Notification {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// `title` field, or [`FALLBACK_TITLE`].
    pub fn title(&self) -> String {
        text_field(&self.payload, "title").unwrap_or_else(|| FALLBACK_TITLE.to_owned())
    }

    /// `message` field, or the compact JSON of the whole payload.
    pub fn body(&self) -> String {
        text_field(&self.payload, "message")
            .unwrap_or_else(|| Value::Object(self.payload.clone()).to_string())
    }
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Frames the relay sends on the push channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    Connect { session: String },
    Notification(Notification),
}

/// Parse a text frame. Unknown or malformed frames yield `None`.
pub fn parse_frame(text: &str) -> Option<ServerFrame> {
    match serde_json::from_str(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::debug!(err = %e, "ignoring unrecognized frame");
            None
        }
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
