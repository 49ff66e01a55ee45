// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hookrelay: accepts webhook events and pushes them to attached agents.

pub mod config;
pub mod error;
pub mod event;
pub mod ingress;
pub mod registry;
pub mod state;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::transport::build_router;

/// Run the relay until `shutdown` is cancelled.
pub async fn run(config: RelayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("hookrelay listening on {addr}");
    serve(listener, Arc::new(RelayState::new(config, shutdown))).await
}

/// Serve on an already-bound listener until `state.shutdown` is cancelled.
/// Tests bind `127.0.0.1:0` and keep a handle on the state.
pub async fn serve(listener: TcpListener, state: Arc<RelayState>) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    tracing::info!("hookrelay stopped");
    Ok(())
}
