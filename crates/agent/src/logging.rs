// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup. The interactive launcher logs to stderr; the background
//! worker has null stdio and appends to a file under `--log-dir`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::AgentConfig;

/// `<dir>/hookcast_<unix-seconds>.log`.
pub fn log_file_path(dir: &Path, now: SystemTime) -> PathBuf {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    dir.join(format!("hookcast_{secs}.log"))
}

/// Create `dir` if needed and open a fresh append-only log file in it.
pub fn open_log_file(dir: &Path) -> anyhow::Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = log_file_path(dir, SystemTime::now());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    Ok((path, file))
}

fn filter(config: &AgentConfig) -> EnvFilter {
    EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr.
pub fn init_stderr(config: &AgentConfig) {
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter(config)).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter(config)).init();
        }
    }
}

/// Log to a new file under `config.log_dir`. Returns its path.
pub fn init_file(config: &AgentConfig) -> anyhow::Result<PathBuf> {
    let (path, file) = open_log_file(&config.log_dir)?;
    let writer = Mutex::new(file);
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter(config)).json().with_writer(writer).init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter(config)).with_ansi(false).with_writer(writer).init();
        }
    }
    Ok(path)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
