// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end harness: a real relay on a loopback port and real agent
//! connection loops attached to it, with recording desktop collaborators.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hookcast::address::ServerAddress;
use hookcast::connection::{ConnectionManager, ConnectionSettings, ConnectionState};
use hookcast::delivery::{Clipboard, Notifier, Pipeline, Toast};
use hookcast::transport::WsConnector;
use hookrelay::config::RelayConfig;
use hookrelay::state::RelayState;

pub const TIMEOUT: Duration = Duration::from_secs(10);

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// A relay served in-process until dropped.
pub struct Relay {
    pub addr: SocketAddr,
    pub state: Arc<RelayState>,
    shutdown: CancellationToken,
}

impl Relay {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_on("127.0.0.1:0".parse()?).await
    }

    /// Start on a specific address, e.g. to bring a relay back on the port a
    /// previous one used.
    pub async fn start_on(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let state = Arc::new(RelayState::new(RelayConfig::default(), shutdown.clone()));
        let serve_state = Arc::clone(&state);
        tokio::spawn(async move {
            let _ = hookrelay::serve(listener, serve_state).await;
        });
        Ok(Self { addr, state, shutdown })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// POST a raw JSON body to `/webhook`.
    pub async fn post(&self, body: &serde_json::Value) -> anyhow::Result<reqwest::Response> {
        ensure_crypto();
        Ok(reqwest::Client::new()
            .post(format!("{}/webhook", self.base_url()))
            .json(body)
            .send()
            .await?)
    }

    /// Wait until the registry holds exactly `expected` sessions.
    pub async fn wait_for_sessions(&self, expected: usize) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        while self.state.registry.len().await != expected {
            anyhow::ensure!(
                tokio::time::Instant::now() < deadline,
                "expected {expected} sessions, have {}",
                self.state.registry.len().await
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Everything the desktop collaborators were asked to do.
#[derive(Debug, Default)]
pub struct Desktop {
    pub toasts: Mutex<Vec<Toast>>,
    pub clipboard: Mutex<Vec<String>>,
}

impl Desktop {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

struct DesktopNotifier(Arc<Desktop>);

impl Notifier for DesktopNotifier {
    fn show(&self, toast: &Toast) -> anyhow::Result<()> {
        if let Ok(mut toasts) = self.0.toasts.lock() {
            toasts.push(toast.clone());
        }
        Ok(())
    }
}

struct DesktopClipboard(Arc<Desktop>);

impl Clipboard for DesktopClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        if let Ok(mut clipboard) = self.0.clipboard.lock() {
            clipboard.push(text.to_owned());
        }
        Ok(())
    }
}

/// An agent connection loop with a real pipeline and recording desktop.
pub struct Agent {
    pub desktop: Arc<Desktop>,
    pub status: hookcast::connection::StatusHandle,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Agent {
    pub async fn attach(relay: &Relay) -> anyhow::Result<Self> {
        let desktop = Arc::new(Desktop::default());
        let pipeline = Pipeline::new(
            Arc::new(DesktopNotifier(Arc::clone(&desktop))),
            Arc::new(DesktopClipboard(Arc::clone(&desktop))),
        );
        let settings = ConnectionSettings {
            retry_min: Duration::from_millis(50),
            retry_max: Duration::from_millis(200),
            ..Default::default()
        };
        let manager = ConnectionManager::new(
            ServerAddress::parse(&relay.base_url())?,
            Arc::new(WsConnector),
            Arc::new(pipeline),
            settings,
        );
        let status = manager.status();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(manager.run(shutdown.clone()));
        Ok(Self { desktop, status, shutdown, task })
    }

    pub async fn wait_connected(&self) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        while self.status.state() != ConnectionState::Connected {
            anyhow::ensure!(tokio::time::Instant::now() < deadline, "agent never connected");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    /// Wait until at least `n` toasts were shown.
    pub async fn wait_for_toasts(&self, n: usize) -> anyhow::Result<Vec<Toast>> {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        loop {
            let toasts = self.desktop.toasts();
            if toasts.len() >= n {
                return Ok(toasts);
            }
            anyhow::ensure!(tokio::time::Instant::now() < deadline, "saw {} of {n} toasts", toasts.len());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn stop(self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        tokio::time::timeout(TIMEOUT, self.task).await??;
        Ok(())
    }
}
