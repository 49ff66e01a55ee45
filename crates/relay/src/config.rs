// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Webhook relay: fans posted events out to connected desktop agents.
#[derive(Debug, Clone, Parser)]
#[command(name = "hookrelay", version, about)]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "HOOKRELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 59999, env = "HOOKRELAY_PORT")]
    pub port: u16,

    /// Maximum number of concurrently attached agents.
    #[arg(long, default_value_t = 1024, env = "HOOKRELAY_MAX_SESSIONS")]
    pub max_sessions: usize,

    /// Interval between liveness pings sent to each agent, in milliseconds.
    #[arg(long, default_value_t = 20_000, env = "HOOKRELAY_PING_INTERVAL_MS")]
    pub ping_interval_ms: u64,

    /// Drop a session after this long without any inbound frame, in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "HOOKRELAY_LIVENESS_TIMEOUT_MS")]
    pub liveness_timeout_ms: u64,

    /// Outbound queue depth per session. A full queue counts as a failed send.
    #[arg(long, default_value_t = 64, env = "HOOKRELAY_SESSION_QUEUE")]
    pub session_queue: usize,

    /// Log level filter (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "HOOKRELAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "HOOKRELAY_LOG_FORMAT")]
    pub log_format: String,
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    /// Reject nonsensical combinations before binding anything.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_sessions == 0 {
            anyhow::bail!("--max-sessions must be at least 1");
        }
        if self.session_queue == 0 {
            anyhow::bail!("--session-queue must be at least 1");
        }
        if self.ping_interval_ms == 0 {
            anyhow::bail!("--ping-interval-ms must be positive");
        }
        if self.liveness_timeout_ms <= self.ping_interval_ms {
            anyhow::bail!("--liveness-timeout-ms must exceed --ping-interval-ms");
        }
        match self.log_format.as_str() {
            "text" | "json" => Ok(()),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 59999,
            max_sessions: 1024,
            ping_interval_ms: 20_000,
            liveness_timeout_ms: 60_000,
            session_queue: 64,
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
