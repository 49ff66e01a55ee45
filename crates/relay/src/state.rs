// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::registry::Registry;

/// Shared relay state.
pub struct RelayState {
    pub registry: Registry,
    pub config: RelayConfig,
    pub shutdown: CancellationToken,
}

impl RelayState {
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Self {
        Self { registry: Registry::new(config.max_sessions), config, shutdown }
    }
}
