// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the relay.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ingress;
use crate::registry::SessionInfo;
use crate::state::RelayState;

// -- Response types -----------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
}

// -- Handlers -----------------------------------------------------------------

/// `POST /webhook`: accept a producer event and fan it out.
///
/// Always answers `{"status":"success"}` for a JSON object, regardless of how
/// many agents received it.
pub async fn webhook(State(s): State<Arc<RelayState>>, body: Bytes) -> Response {
    match ingress::accept(&s.registry, &body).await {
        Ok(_) => Json(WebhookResponse { status: "success".to_owned() }).into_response(),
        Err(e) => {
            tracing::warn!(err = %e, bytes = body.len(), "rejected webhook body");
            e.into_response()
        }
    }
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), session_count: s.registry.len().await })
}

/// `GET /api/v1/sessions`
pub async fn list_sessions(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    let mut list: Vec<SessionInfo> = s.registry.snapshot().await.iter().map(|e| e.info()).collect();
    list.sort_by_key(|info| info.connected_at_ms);
    Json(list)
}
