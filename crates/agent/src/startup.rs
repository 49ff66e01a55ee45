// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two ways the agent runs.
//!
//! Interactive: instance check, read the server address, probe it, launch a
//! detached worker, exit. Background: instance check, then connection
//! manager and control loop until quit.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::address::ServerAddress;
use crate::config::{AgentConfig, InstanceStrategy};
use crate::connection::{check_reachable, ConnectionManager, Connector};
use crate::control::{run_control_loop, ControlAction};
use crate::delivery::{Deliver, Notifier, Pipeline};
use crate::desktop::{CommandClipboard, CommandNotifier, LogNotifier};
use crate::error::AgentError;
use crate::instance::{Acquire, InstanceGuard, InstanceProbe, LockFile, ProcessTable, BACKGROUND_ROLE};
use crate::spawn::{confirm_started, Spawner};

/// How long a fresh worker gets to fail before the launcher reports success.
pub const SPAWN_GRACE: Duration = Duration::from_secs(1);

pub const PROMPT: &str = "Enter server address (e.g. http://192.168.1.10:59999): ";

// -- Collaborator selection ---------------------------------------------------

pub fn instance_probe(config: &AgentConfig) -> anyhow::Result<Box<dyn InstanceProbe>> {
    Ok(match config.instance_strategy()? {
        InstanceStrategy::Process => Box::new(ProcessTable::for_current_process()?),
        InstanceStrategy::Lockfile => Box::new(LockFile::new(config.lock_path())),
    })
}

/// Probe to use when the preferred one cannot be built; never reports a
/// running instance.
struct NoProbe;

impl InstanceProbe for NoProbe {
    fn detect_running_instance(&self, _role_tag: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

pub fn instance_guard(config: &AgentConfig) -> InstanceGuard {
    match instance_probe(config) {
        Ok(probe) => InstanceGuard::new(probe),
        Err(e) => {
            warn!(err = %format!("{e:#}"), "instance detection unavailable");
            InstanceGuard::new(Box::new(NoProbe))
        }
    }
}

pub fn notifier(config: &AgentConfig) -> Arc<dyn Notifier> {
    match config.notifier.as_str() {
        "log" => Arc::new(LogNotifier),
        _ => Arc::new(CommandNotifier::for_host()),
    }
}

pub fn pipeline(notifier: Arc<dyn Notifier>) -> Arc<dyn Deliver> {
    Arc::new(Pipeline::new(notifier, Arc::new(CommandClipboard::for_host())))
}

// -- Interactive --------------------------------------------------------------

/// Ask for an address until a non-empty line is entered.
pub fn prompt_address(input: &mut impl BufRead, output: &mut impl Write) -> Result<String, AgentError> {
    loop {
        let _ = write!(output, "{PROMPT}");
        let _ = output.flush();
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => return Err(AgentError::InvalidAddress("no address entered".to_owned())),
            Ok(_) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_owned());
                }
            }
            Err(e) => return Err(AgentError::InvalidAddress(format!("cannot read address: {e}"))),
        }
    }
}

/// A worker launched by the interactive flow.
#[derive(Debug)]
pub struct Launched {
    pub pid: u32,
    pub address: ServerAddress,
}

pub struct Interactive {
    pub guard: InstanceGuard,
    pub connector: Arc<dyn Connector>,
    pub spawner: Box<dyn Spawner>,
    pub grace: Duration,
}

impl Interactive {
    /// `read_address` runs only when the config carries no server address.
    pub async fn run<F>(&self, config: &AgentConfig, read_address: F) -> Result<Launched, AgentError>
    where
        F: FnOnce() -> Result<String, AgentError>,
    {
        if self.guard.try_acquire(BACKGROUND_ROLE) == Acquire::AlreadyRunning {
            return Err(AgentError::AlreadyRunning);
        }

        let raw = match config.server.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(server) => server.to_owned(),
            None => read_address()?,
        };
        let address = ServerAddress::parse(&raw)?;

        check_reachable(self.connector.as_ref(), &address, config.connect_timeout()).await?;

        let mut handle = self.spawner.spawn_detached(&config.background_args(address.as_str()))?;
        confirm_started(&mut handle, self.grace).await?;
        Ok(Launched { pid: handle.pid(), address })
    }
}

// -- Background ---------------------------------------------------------------

pub struct Background {
    pub guard: InstanceGuard,
    /// Held for the worker's lifetime under `--instance lockfile`.
    pub lock: Option<LockFile>,
    pub connector: Arc<dyn Connector>,
    pub sink: Arc<dyn Deliver>,
    pub notifier: Arc<dyn Notifier>,
}

impl Background {
    /// Run until `shutdown` is cancelled, by a quit action or otherwise.
    pub async fn run(
        self,
        config: &AgentConfig,
        actions: mpsc::Receiver<ControlAction>,
        shutdown: CancellationToken,
    ) -> Result<(), AgentError> {
        if self.guard.try_acquire(BACKGROUND_ROLE) == Acquire::AlreadyRunning {
            return Err(AgentError::AlreadyRunning);
        }
        let _hold = match self.lock.as_ref().map(LockFile::hold) {
            None => None,
            Some(Ok(Some(hold))) => Some(hold),
            Some(Ok(None)) => return Err(AgentError::AlreadyRunning),
            Some(Err(e)) => {
                warn!(err = %format!("{e:#}"), "cannot take instance lock, continuing");
                None
            }
        };

        let raw = config
            .server
            .as_deref()
            .ok_or_else(|| AgentError::InvalidAddress("background worker needs a server address".to_owned()))?;
        let address = ServerAddress::parse(raw)?;
        info!(server = %address, pid = std::process::id(), "background worker started");

        let manager =
            ConnectionManager::new(address, self.connector, self.sink, config.connection_settings());
        let status = manager.status();
        let control = tokio::spawn(run_control_loop(actions, status, self.notifier, shutdown.clone()));

        manager.run(shutdown.clone()).await;
        shutdown.cancel();
        if let Err(e) = control.await {
            warn!(err = %e, "control loop failed");
        }
        info!("background worker stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
