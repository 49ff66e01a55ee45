// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery pipeline: hand each pushed notification to the desktop.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AgentError;
use crate::notification::Notification;

/// Appended to the toast body when the clipboard mirror succeeded.
pub const COPIED_SUFFIX: &str = "(copied to clipboard)";

/// Receives notifications in arrival order. Implementations must not panic
/// on collaborator failure.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification);
}

/// How long a toast should stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastDuration {
    Short,
    Long,
}

impl ToastDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub body: String,
    pub duration: ToastDuration,
}

/// Renders a desktop toast.
pub trait Notifier: Send + Sync {
    fn show(&self, toast: &Toast) -> anyhow::Result<()>;
}

/// Writes text to the system clipboard.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> anyhow::Result<()>;
}

/// Default pipeline: mirror the body to the clipboard, then show a toast.
pub struct Pipeline {
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
}

impl Pipeline {
    pub fn new(notifier: Arc<dyn Notifier>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self { notifier, clipboard }
    }
}

impl Deliver for Pipeline {
    fn deliver(&self, notification: &Notification) {
        let title = notification.title();
        let body = notification.body();
        info!(title = %title, body = %body, "notification received");

        let copied = match self.clipboard.copy(&body) {
            Ok(()) => {
                info!("copied notification body to clipboard");
                true
            }
            Err(e) => {
                let err = AgentError::CollaboratorFailure {
                    collaborator: "clipboard",
                    reason: format!("{e:#}"),
                };
                warn!(err = %err, "clipboard mirror failed");
                false
            }
        };

        let body = if copied { format!("{body}\n\n{COPIED_SUFFIX}") } else { body };
        let toast = Toast { title, body, duration: ToastDuration::Long };
        if let Err(e) = self.notifier.show(&toast) {
            let err =
                AgentError::CollaboratorFailure { collaborator: "notifier", reason: format!("{e:#}") };
            warn!(err = %err, "toast render failed");
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
