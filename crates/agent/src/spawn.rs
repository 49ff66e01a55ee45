// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching the background worker as a detached process.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AgentError;

/// A launched worker. Dropping it does not stop the process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    child: Child,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// `Some(code)` if the worker has already exited, `None` while it runs.
    pub fn try_exit_code(&mut self) -> Result<Option<i32>, AgentError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Some(status.code().unwrap_or(-1))),
            Ok(None) => Ok(None),
            Err(e) => Err(AgentError::Spawn(format!("cannot poll pid {}: {e}", self.pid))),
        }
    }
}

/// Starts a process that outlives the caller.
pub trait Spawner: Send + Sync {
    fn spawn_detached(&self, args: &[OsString]) -> Result<ProcessHandle, AgentError>;
}

/// Re-executes a program (by default the running binary) in its own process
/// group with null stdio, so it survives the launching terminal.
#[derive(Debug, Clone)]
pub struct DetachedSpawner {
    program: PathBuf,
}

impl DetachedSpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn current_exe() -> Result<Self, AgentError> {
        let exe = std::env::current_exe()
            .map_err(|e| AgentError::Spawn(format!("cannot resolve current executable: {e}")))?;
        Ok(Self::new(exe))
    }
}

impl Spawner for DetachedSpawner {
    fn spawn_detached(&self, args: &[OsString]) -> Result<ProcessHandle, AgentError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| AgentError::Spawn(format!("{}: {e}", self.program.display())))?;
        let pid = child.id();
        info!(pid, program = %self.program.display(), "background worker launched");
        Ok(ProcessHandle { pid, child })
    }
}

/// Give a fresh worker `grace` to fail fast, then report what happened.
/// A worker still running afterwards counts as started.
pub async fn confirm_started(handle: &mut ProcessHandle, grace: Duration) -> Result<(), AgentError> {
    tokio::time::sleep(grace).await;
    match handle.try_exit_code()? {
        None => {
            info!(pid = handle.pid(), "background worker is running");
            Ok(())
        }
        // Another worker won the race; the new one stood down.
        Some(0) => {
            info!(pid = handle.pid(), "background worker exited immediately");
            Ok(())
        }
        Some(code) => {
            warn!(pid = handle.pid(), code, "background worker failed to start");
            Err(AgentError::Spawn(format!("worker exited with status {code}")))
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
