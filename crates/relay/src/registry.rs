// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live agent sessions and event fan-out.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::event::Event;

/// One attached agent connection.
pub struct Session {
    pub id: String,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: Instant,
    pub connected_at_ms: u64,
    /// Cleared when the liveness timer expires.
    pub alive: AtomicBool,
    /// Cancelled when the session is unregistered.
    pub cancel: CancellationToken,
    tx: mpsc::Sender<Arc<str>>,
}

impl Session {
    /// Queue a serialized frame for this session without waiting.
    pub fn push(&self, frame: Arc<str>) -> Result<(), PushError> {
        if self.cancel.is_cancelled() || !self.is_alive() {
            return Err(PushError::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            remote_addr: self.remote_addr.map(|a| a.to_string()),
            connected_at_ms: self.connected_at_ms,
            alive: self.is_alive(),
        }
    }
}

/// Why a push to one session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The session's outbound queue is full.
    Full,
    /// The session has disconnected or is being torn down.
    Closed,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("outbound queue full"),
            Self::Closed => f.write_str("session closed"),
        }
    }
}

/// Serializable view of a session for the HTTP listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub remote_addr: Option<String>,
    pub connected_at_ms: u64,
    pub alive: bool,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Set of live sessions keyed by session ID.
pub struct Registry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    capacity: usize,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), capacity }
    }

    /// Allocate a session that pushes frames into `tx`.
    ///
    /// IDs are random UUIDs, so a destroyed session's ID never addresses a
    /// later connection.
    pub async fn register(
        &self,
        remote_addr: Option<SocketAddr>,
        tx: mpsc::Sender<Arc<str>>,
    ) -> Result<Arc<Session>, RelayError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.capacity {
            return Err(RelayError::ResourceExhausted);
        }

        let mut id = uuid::Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = uuid::Uuid::new_v4().to_string();
        }

        let session = Arc::new(Session {
            id: id.clone(),
            remote_addr,
            connected_at: Instant::now(),
            connected_at_ms: epoch_ms(),
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            tx,
        });
        sessions.insert(id, Arc::clone(&session));
        Ok(session)
    }

    /// Remove a session. Returns `false` when the ID is unknown, which makes
    /// duplicate disconnect notifications harmless.
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).map(Arc::clone)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Copy out the current session handles. The lock is released on return.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().map(Arc::clone).collect()
    }

    /// Push `event` to every session in the current snapshot.
    ///
    /// Sessions registered after the snapshot do not receive the event. A
    /// failing recipient is counted and logged; the remaining recipients are
    /// still attempted.
    pub async fn broadcast(&self, event: &Event) -> DeliveryReport {
        let recipients = self.snapshot().await;
        let mut report = DeliveryReport { attempted: recipients.len(), ..Default::default() };

        let frame: Arc<str> = match event.to_frame() {
            Ok(frame) => frame.into(),
            Err(e) => {
                tracing::error!(err = %e, "failed to encode notification frame");
                report.failed = report.attempted;
                return report;
            }
        };

        for session in &recipients {
            match session.push(Arc::clone(&frame)) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(session_id = %session.id, err = %e, "push to session failed");
                }
            }
        }
        report
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
