// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted transports and recording sinks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::connection::{BoxFuture, ConnectionState, Connector, Incoming, Link, StatusHandle};
use crate::delivery::Deliver;
use crate::error::AgentError;
use crate::notification::Notification;

/// One scripted connect attempt.
pub enum Attempt {
    Fail(String),
    /// Connect succeeds; the link yields these items, then stays silent
    /// until closed.
    Link(Vec<Result<Option<Incoming>, AgentError>>),
}

/// Connector that plays back a fixed list of attempts. Attempts beyond the
/// script fail.
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Attempt>>,
    attempts: AtomicUsize,
    closed: Arc<AtomicBool>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Attempt>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether any link handed out has been closed by its owner.
    pub fn link_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, AgentError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let closed = Arc::clone(&self.closed);
        Box::pin(async move {
            match next {
                Some(Attempt::Link(items)) => {
                    Ok(Box::new(ScriptedLink { items: items.into(), closed }) as Box<dyn Link>)
                }
                Some(Attempt::Fail(reason)) => Err(AgentError::Transport(reason)),
                None => Err(AgentError::Transport("script exhausted".to_owned())),
            }
        })
    }
}

struct ScriptedLink {
    items: VecDeque<Result<Option<Incoming>, AgentError>>,
    closed: Arc<AtomicBool>,
}

impl Link for ScriptedLink {
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Incoming>, AgentError>> {
        let next = self.items.pop_front();
        Box::pin(async move {
            match next {
                Some(item) => item,
                None => std::future::pending().await,
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async {})
    }
}

/// Build a `notification` text frame.
pub fn notification_frame(payload: serde_json::Value) -> Incoming {
    Incoming::Text(serde_json::json!({"event": "notification", "data": payload}).to_string())
}

/// A delivered notification plus the connection state observed at delivery.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub notification: Notification,
    pub state: Option<ConnectionState>,
}

/// Sink that forwards every delivery to a channel.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Delivered>,
    status: Mutex<Option<StatusHandle>>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivered>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx, status: Mutex::new(None) }), rx)
    }

    /// Record the manager's state alongside each delivery.
    pub fn observe(&self, status: StatusHandle) {
        if let Ok(mut slot) = self.status.lock() {
            *slot = Some(status);
        }
    }
}

impl Deliver for RecordingSink {
    fn deliver(&self, notification: &Notification) {
        let state = self.status.lock().ok().and_then(|s| s.as_ref().map(StatusHandle::state));
        let _ = self.tx.send(Delivered { notification: notification.clone(), state });
    }
}
