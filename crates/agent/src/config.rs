// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::connection::ConnectionSettings;
use crate::instance::BACKGROUND_ROLE;

/// How the single-instance guard detects a running worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStrategy {
    /// Scan the process table for a `--background` sibling.
    #[default]
    Process,
    /// Advisory lock held by the worker.
    Lockfile,
}

impl std::fmt::Display for InstanceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Lockfile => f.write_str("lockfile"),
        }
    }
}

impl std::str::FromStr for InstanceStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "lockfile" => Ok(Self::Lockfile),
            other => anyhow::bail!("invalid instance strategy: {other}"),
        }
    }
}

/// Desktop agent: receives relayed webhooks as toasts and clipboard text.
#[derive(Debug, Clone, Parser)]
#[command(name = "hookcast", version, about)]
pub struct AgentConfig {
    /// Relay address, e.g. `http://relay.local:59999`. Prompted for when absent.
    #[arg(env = "HOOKCAST_SERVER")]
    pub server: Option<String>,

    /// Run as the background delivery worker.
    #[arg(long)]
    pub background: bool,

    /// First reconnect delay, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "HOOKCAST_RETRY_MIN_MS")]
    pub retry_min_ms: u64,

    /// Reconnect delay cap, in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "HOOKCAST_RETRY_MAX_MS")]
    pub retry_max_ms: u64,

    /// Bound on a single connect attempt, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "HOOKCAST_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,

    /// Reconnect after this long without any frame from the relay, in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "HOOKCAST_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    /// Single-instance detection: `process` or `lockfile`.
    #[arg(long, default_value = "process", env = "HOOKCAST_INSTANCE")]
    pub instance: String,

    /// Lock file used by `--instance lockfile`.
    #[arg(long, env = "HOOKCAST_LOCK_PATH")]
    pub lock_path: Option<PathBuf>,

    /// Directory for the background worker's log files.
    #[arg(long, default_value = "logs", env = "HOOKCAST_LOG_DIR")]
    pub log_dir: PathBuf,

    /// Log level filter (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "HOOKCAST_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "HOOKCAST_LOG_FORMAT")]
    pub log_format: String,

    /// Toast renderer: `auto` (desktop command) or `log`.
    #[arg(long, default_value = "auto", env = "HOOKCAST_NOTIFIER")]
    pub notifier: String,
}

impl AgentConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry_min_ms == 0 {
            anyhow::bail!("--retry-min-ms must be positive");
        }
        if self.retry_max_ms < self.retry_min_ms {
            anyhow::bail!("--retry-max-ms must be at least --retry-min-ms");
        }
        if self.connect_timeout_ms == 0 || self.idle_timeout_ms == 0 {
            anyhow::bail!("timeouts must be positive");
        }
        self.instance_strategy()?;
        match self.notifier.as_str() {
            "auto" | "log" => {}
            other => anyhow::bail!("invalid notifier: {other}"),
        }
        match self.log_format.as_str() {
            "text" | "json" => Ok(()),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }

    pub fn instance_strategy(&self) -> anyhow::Result<InstanceStrategy> {
        self.instance.parse()
    }

    /// Lock path for `--instance lockfile`; defaults to the OS temp dir.
    pub fn lock_path(&self) -> PathBuf {
        self.lock_path.clone().unwrap_or_else(|| std::env::temp_dir().join("hookcast.lock"))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            retry_min: Duration::from_millis(self.retry_min_ms),
            retry_max: Duration::from_millis(self.retry_max_ms),
            connect_timeout: self.connect_timeout(),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }

    /// Arguments for re-executing this binary as the background worker.
    /// Tuning flags are forwarded so the worker behaves like its launcher.
    pub fn background_args(&self, server: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![BACKGROUND_ROLE.into(), server.into()];
        let mut flag = |name: &str, value: OsString| {
            args.push(format!("--{name}").into());
            args.push(value);
        };
        flag("retry-min-ms", self.retry_min_ms.to_string().into());
        flag("retry-max-ms", self.retry_max_ms.to_string().into());
        flag("connect-timeout-ms", self.connect_timeout_ms.to_string().into());
        flag("idle-timeout-ms", self.idle_timeout_ms.to_string().into());
        flag("instance", self.instance.clone().into());
        if let Some(ref path) = self.lock_path {
            flag("lock-path", path.clone().into_os_string());
        }
        flag("log-dir", self.absolute_log_dir().into_os_string());
        flag("log-level", self.log_level.clone().into());
        flag("log-format", self.log_format.clone().into());
        flag("notifier", self.notifier.clone().into());
        args
    }

    /// The worker is started in the launcher's cwd, but resolve the log dir
    /// anyway so the path in the launcher's output is unambiguous.
    fn absolute_log_dir(&self) -> PathBuf {
        if self.log_dir.is_absolute() {
            return self.log_dir.clone();
        }
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(&self.log_dir),
            Err(_) => self.log_dir.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
