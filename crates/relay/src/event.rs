// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepted webhook events and the push-channel wire format.
//!
//! The relay forwards the producer's JSON object verbatim; the normalized
//! title/message are derived for logging and delivery reports only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RelayError;

/// Title used when the payload carries none.
pub const DEFAULT_TITLE: &str = "New notification";

/// One accepted notification payload. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    title: String,
    message: String,
    payload: Map<String, Value>,
}

impl Event {
    /// Normalize a parsed JSON object.
    ///
    /// A missing or null `title` falls back to [`DEFAULT_TITLE`]; a missing
    /// or null `message` falls back to the compact JSON rendering of the
    /// whole payload. Non-string values are rendered as JSON.
    pub fn from_payload(payload: Map<String, Value>) -> Self {
        let title = text_field(&payload, "title").unwrap_or_else(|| DEFAULT_TITLE.to_owned());
        let message = text_field(&payload, "message")
            .unwrap_or_else(|| Value::Object(payload.clone()).to_string());
        Self { title, message, payload }
    }

    /// Parse and normalize a raw request body.
    pub fn from_slice(raw: &[u8]) -> Result<Self, RelayError> {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Self::from_payload(map)),
            _ => Err(RelayError::MalformedPayload),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The producer's object, exactly as posted.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Fields other than `title` and `message`.
    pub fn extra(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.payload.iter().filter(|(k, _)| k.as_str() != "title" && k.as_str() != "message")
    }

    /// Serialize the `notification` push frame for this event.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ServerFrame::Notification(self.payload.clone()))
    }
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Frames pushed from the relay to agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once after registration.
    Connect { session: String },
    /// An accepted webhook payload, verbatim.
    Notification(Map<String, Value>),
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
