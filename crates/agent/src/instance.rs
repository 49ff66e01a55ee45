// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance guard: at most one background worker per host.
//!
//! Detection is best effort. Two launches racing each other may both get
//! through; a probe that cannot run is treated as "nothing running".

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, info, warn};

/// argv marker that identifies the background worker.
pub const BACKGROUND_ROLE: &str = "--background";

/// Answers "is another worker with this role already running?".
pub trait InstanceProbe: Send + Sync {
    fn detect_running_instance(&self, role_tag: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Acquired,
    AlreadyRunning,
}

pub struct InstanceGuard {
    probe: Box<dyn InstanceProbe>,
}

impl InstanceGuard {
    pub fn new(probe: Box<dyn InstanceProbe>) -> Self {
        Self { probe }
    }

    pub fn try_acquire(&self, role_tag: &str) -> Acquire {
        match self.probe.detect_running_instance(role_tag) {
            Ok(true) => {
                info!(role = role_tag, "another instance is already running");
                Acquire::AlreadyRunning
            }
            Ok(false) => Acquire::Acquired,
            Err(e) => {
                warn!(role = role_tag, err = %format!("{e:#}"), "instance probe failed, continuing");
                Acquire::Acquired
            }
        }
    }
}

// -- Process table ------------------------------------------------------------

/// Scans `<root>/<pid>/cmdline` for a process running this executable with
/// the role marker.
#[derive(Debug, Clone)]
pub struct ProcessTable {
    root: PathBuf,
    exe_name: OsString,
    own_pid: u32,
}

impl ProcessTable {
    pub fn new(root: impl Into<PathBuf>, exe_name: impl Into<OsString>, own_pid: u32) -> Self {
        Self { root: root.into(), exe_name: exe_name.into(), own_pid }
    }

    /// Probe `/proc` for siblings of the running executable.
    pub fn for_current_process() -> anyhow::Result<Self> {
        let exe = std::env::current_exe().context("cannot resolve current executable")?;
        let name = exe
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("executable path has no file name: {}", exe.display()))?;
        Ok(Self::new("/proc", name, std::process::id()))
    }

    fn matches(&self, cmdline: &[u8], role_tag: &str) -> bool {
        let mut args = cmdline.split(|&b| b == 0).filter(|a| !a.is_empty());
        let Some(argv0) = args.next() else {
            return false;
        };
        let Ok(argv0) = std::str::from_utf8(argv0) else {
            return false;
        };
        if Path::new(argv0).file_name() != Some(self.exe_name.as_os_str()) {
            return false;
        }
        args.any(|a| a == role_tag.as_bytes())
    }
}

impl InstanceProbe for ProcessTable {
    fn detect_running_instance(&self, role_tag: &str) -> anyhow::Result<bool> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("cannot read {}", self.root.display()))?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            if pid == self.own_pid {
                continue;
            }
            // Processes exit between listing and reading; skip them.
            let Ok(cmdline) = std::fs::read(entry.path().join("cmdline")) else {
                continue;
            };
            if self.matches(&cmdline, role_tag) {
                debug!(pid, "found running instance");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// -- Lock file ----------------------------------------------------------------

/// Advisory `flock(2)` on a well-known path. The worker holds it for its
/// lifetime; the kernel releases it when the process exits.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

/// A held lock. Released on drop.
#[derive(Debug)]
pub struct LockHold {
    _lock: Flock<File>,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .with_context(|| format!("cannot open lock file {}", self.path.display()))
    }

    fn try_lock(&self) -> anyhow::Result<Option<Flock<File>>> {
        match Flock::lock(self.open()?, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(lock)),
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, errno)) => anyhow::bail!("flock {} failed: {errno}", self.path.display()),
        }
    }

    /// Take the lock for the caller's lifetime. `None` when someone else
    /// already holds it.
    pub fn hold(&self) -> anyhow::Result<Option<LockHold>> {
        Ok(self.try_lock()?.map(|lock| LockHold { _lock: lock }))
    }
}

impl InstanceProbe for LockFile {
    fn detect_running_instance(&self, _role_tag: &str) -> anyhow::Result<bool> {
        // A successful probe lock is released again when dropped here.
        Ok(self.try_lock()?.is_none())
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
