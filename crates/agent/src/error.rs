// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failures the agent distinguishes. Only `ReachabilityCheckFailed`,
/// `AlreadyRunning`, `InvalidAddress` and `Spawn` ever reach the user; the
/// rest are logged where they happen.
#[derive(Debug)]
pub enum AgentError {
    /// Network failure while connecting or connected. Recovered by the
    /// reconnect loop.
    Transport(String),
    /// The startup probe could not reach the relay.
    ReachabilityCheckFailed { url: String, reason: String },
    /// Another background worker is active on this host.
    AlreadyRunning,
    /// A render or clipboard step failed for one event.
    CollaboratorFailure { collaborator: &'static str, reason: String },
    /// The background worker could not be launched.
    Spawn(String),
    /// The server address is not `scheme://host:port`.
    InvalidAddress(String),
}

impl AgentError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::ReachabilityCheckFailed { .. } => "REACHABILITY_CHECK_FAILED",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::CollaboratorFailure { .. } => "COLLABORATOR_FAILURE",
            Self::Spawn(_) => "SPAWN_ERROR",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
        }
    }

    /// Process exit code when this error ends the interactive flow.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning => 0,
            Self::InvalidAddress(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
            Self::ReachabilityCheckFailed { url, reason } => {
                write!(f, "cannot reach server {url}: {reason}")
            }
            Self::AlreadyRunning => f.write_str("a background worker is already running"),
            Self::CollaboratorFailure { collaborator, reason } => {
                write!(f, "{collaborator} failed: {reason}")
            }
            Self::Spawn(reason) => write!(f, "failed to start background worker: {reason}"),
            Self::InvalidAddress(reason) => write!(f, "invalid server address: {reason}"),
        }
    }
}

impl std::error::Error for AgentError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
