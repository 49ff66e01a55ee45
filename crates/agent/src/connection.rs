// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent link to the relay: connect, detect loss, back off, reconnect.
//!
//! The manager is the only writer of the connection state. Everything else
//! reads it through a [`StatusHandle`]. Failures never leave the loop; the
//! only connection error a caller ever sees comes from [`check_reachable`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::ServerAddress;
use crate::delivery::Deliver;
use crate::error::AgentError;
use crate::notification::{parse_frame, ServerFrame};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// -- State --------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the manager's state, cheap to clone.
#[derive(Clone)]
pub struct StatusHandle {
    state: Arc<AtomicU8>,
    address: ServerAddress,
}

impl StatusHandle {
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }
}

// -- Transport seam -----------------------------------------------------------

/// Something read off a live link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    /// Ping, pong, or any other frame that only proves the peer is alive.
    Activity,
}

/// Opens links to the relay. Object-safe for use as `Arc<dyn Connector>`.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, AgentError>>;
}

/// One established link.
pub trait Link: Send {
    /// Next inbound item; `Ok(None)` when the peer closed the link.
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Incoming>, AgentError>>;

    fn close(&mut self) -> BoxFuture<'_, ()>;
}

// -- Backoff ------------------------------------------------------------------

/// Exponential retry delay, doubling from `min` up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self { min, max, current: min }
    }

    /// Delay to wait now; the following call returns twice as much, capped.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

// -- Manager ------------------------------------------------------------------

/// Timing knobs for the connection loop.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub retry_min: Duration,
    pub retry_max: Duration,
    pub connect_timeout: Duration,
    /// Treat the link as lost after this long without any inbound frame.
    pub idle_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            retry_min: Duration::from_secs(5),
            retry_max: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

pub struct ConnectionManager {
    address: ServerAddress,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn Deliver>,
    settings: ConnectionSettings,
    state: Arc<AtomicU8>,
    transitions: broadcast::Sender<ConnectionState>,
}

/// Why a connected session ended.
enum LinkEnd {
    Lost(String),
    Shutdown,
}

impl ConnectionManager {
    pub fn new(
        address: ServerAddress,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn Deliver>,
        settings: ConnectionSettings,
    ) -> Self {
        let (transitions, _) = broadcast::channel(64);
        Self {
            address,
            connector,
            sink,
            settings,
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)),
            transitions,
        }
    }

    pub fn status(&self) -> StatusHandle {
        StatusHandle { state: Arc::clone(&self.state), address: self.address.clone() }
    }

    /// Observe every state transition, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.transitions.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.store(next as u8, Ordering::Release);
        let _ = self.transitions.send(next);
    }

    /// Run until `shutdown` is cancelled. Never returns early on failure.
    pub async fn run(self, shutdown: CancellationToken) {
        let url = self.address.ws_url().to_owned();
        let mut backoff = Backoff::new(self.settings.retry_min, self.settings.retry_max);
        let mut delay = Duration::ZERO;

        self.set_state(ConnectionState::Disconnected);
        loop {
            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if shutdown.is_cancelled() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            info!(server = %self.address, "connecting to relay");

            let attempt = tokio::select! {
                _ = shutdown.cancelled() => {
                    self.set_state(ConnectionState::Disconnected);
                    break;
                }
                r = tokio::time::timeout(self.settings.connect_timeout, self.connector.connect(&url)) => r,
            };

            let mut link = match attempt {
                Ok(Ok(link)) => link,
                Ok(Err(e)) => {
                    self.set_state(ConnectionState::Disconnected);
                    delay = backoff.next_delay();
                    warn!(server = %self.address, err = %e, retry_ms = delay.as_millis() as u64, "connection failed");
                    continue;
                }
                Err(_) => {
                    self.set_state(ConnectionState::Disconnected);
                    delay = backoff.next_delay();
                    warn!(server = %self.address, retry_ms = delay.as_millis() as u64, "connection timed out");
                    continue;
                }
            };

            self.set_state(ConnectionState::Connected);
            backoff.reset();
            info!(server = %self.address, "connected to relay");
            let connected_at = Instant::now();

            match self.pump(link.as_mut(), &shutdown).await {
                LinkEnd::Shutdown => {
                    link.close().await;
                    self.set_state(ConnectionState::Disconnected);
                    break;
                }
                LinkEnd::Lost(reason) => {
                    self.set_state(ConnectionState::Disconnected);
                    info!(server = %self.address, reason = %reason, "disconnected from relay");
                }
            }

            // A healthy session earns an immediate redial; a link that drops
            // right after the handshake goes through the backoff.
            delay = if connected_at.elapsed() >= self.settings.retry_min {
                Duration::ZERO
            } else {
                backoff.next_delay()
            };
        }
        info!("connection manager stopped");
    }

    /// Read a connected link until it ends, delivering notifications in order.
    async fn pump(&self, link: &mut dyn Link, shutdown: &CancellationToken) -> LinkEnd {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return LinkEnd::Shutdown,
                r = tokio::time::timeout(self.settings.idle_timeout, link.recv()) => r,
            };

            match next {
                Err(_) => return LinkEnd::Lost("idle timeout".to_owned()),
                Ok(Err(e)) => return LinkEnd::Lost(e.to_string()),
                Ok(Ok(None)) => return LinkEnd::Lost("closed by relay".to_owned()),
                Ok(Ok(Some(Incoming::Activity))) => {}
                Ok(Ok(Some(Incoming::Text(text)))) => match parse_frame(&text) {
                    Some(ServerFrame::Connect { session }) => {
                        info!(session_id = %session, "relay assigned session");
                    }
                    Some(ServerFrame::Notification(notification)) => {
                        let sink = Arc::clone(&self.sink);
                        let result =
                            tokio::task::spawn_blocking(move || sink.deliver(&notification)).await;
                        if let Err(e) = result {
                            warn!(err = %e, "delivery task failed");
                        }
                    }
                    None => {}
                },
            }
        }
    }
}

/// One-shot startup probe: connect within `timeout`, then close.
pub async fn check_reachable(
    connector: &dyn Connector,
    address: &ServerAddress,
    timeout: Duration,
) -> Result<(), AgentError> {
    let url = address.ws_url();
    let failed = |reason: String| AgentError::ReachabilityCheckFailed {
        url: address.as_str().to_owned(),
        reason,
    };

    match tokio::time::timeout(timeout, connector.connect(url)).await {
        Ok(Ok(mut link)) => {
            link.close().await;
            info!(server = %address, "reachability check passed");
            Ok(())
        }
        Ok(Err(e)) => Err(failed(e.to_string())),
        Err(_) => Err(failed(format!("timed out after {}ms", timeout.as_millis()))),
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
