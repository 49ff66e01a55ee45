// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface for the background worker: "show status" and "quit".
//!
//! The worker has no terminal, so the default surface is Unix signals:
//! `SIGUSR1` shows status, `SIGINT`/`SIGTERM` quit. `SIGHUP` is ignored so
//! closing the launching terminal does not end the worker.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::connection::StatusHandle;
use crate::delivery::{Notifier, Toast, ToastDuration};

pub const STATUS_TITLE: &str = "hookcast";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ShowStatus,
    Quit,
}

/// Toast describing the current connection.
pub fn status_toast(status: &StatusHandle) -> Toast {
    Toast {
        title: STATUS_TITLE.to_owned(),
        body: format!("Status: {}\nServer: {}", status.state(), status.address()),
        duration: ToastDuration::Short,
    }
}

/// Forward Unix signals as control actions until `shutdown` fires.
pub fn spawn_signal_surface(
    actions: mpsc::Sender<ControlAction>,
    shutdown: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    // Installing a handler replaces the default terminate disposition.
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let action = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sigusr1.recv() => ControlAction::ShowStatus,
                _ = sigterm.recv() => {
                    info!("received SIGTERM");
                    ControlAction::Quit
                }
                _ = sigint.recv() => {
                    info!("received SIGINT");
                    ControlAction::Quit
                }
                _ = sighup.recv() => {
                    info!("ignoring SIGHUP");
                    continue;
                }
            };
            if actions.send(action).await.is_err() {
                break;
            }
        }
    }))
}

/// Act on control input. Quit cancels `shutdown`; the loop also ends when
/// `shutdown` fires for any other reason or the surface goes away.
pub async fn run_control_loop(
    mut actions: mpsc::Receiver<ControlAction>,
    status: StatusHandle,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
) {
    loop {
        let action = tokio::select! {
            _ = shutdown.cancelled() => break,
            a = actions.recv() => match a {
                Some(a) => a,
                None => break,
            },
        };

        match action {
            ControlAction::ShowStatus => {
                let toast = status_toast(&status);
                info!(state = %status.state(), server = %status.address(), "status requested");
                let notifier = Arc::clone(&notifier);
                match tokio::task::spawn_blocking(move || notifier.show(&toast)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(err = %format!("{e:#}"), "status toast failed"),
                    Err(e) => warn!(err = %e, "status task failed"),
                }
            }
            ControlAction::Quit => {
                info!("quit requested");
                shutdown.cancel();
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
