// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent push channel: one WebSocket per registered session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::Extensions;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::event::ServerFrame;
use crate::registry::Session;
use crate::state::RelayState;

/// `GET /ws`: register a session, then upgrade.
///
/// Registration happens before the upgrade so a full registry rejects the
/// handshake with `503` instead of accepting and immediately closing. A
/// broadcast can therefore count a session whose handshake is still in
/// flight as `succeeded`; if that upgrade then fails, the queued frame is
/// dropped with the session.
pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    extensions: Extensions,
    ws: WebSocketUpgrade,
) -> Response {
    let remote_addr = extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0);
    let (tx, rx) = mpsc::channel(state.config.session_queue);

    let session = match state.registry.register(remote_addr, tx).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(remote = ?remote_addr, err = %e, "rejected agent handshake");
            return e.into_response();
        }
    };

    let failed_state = Arc::clone(&state);
    let failed_id = session.id.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::debug!(session_id = %failed_id, err = %e, "websocket upgrade failed");
        tokio::spawn(async move {
            failed_state.registry.unregister(&failed_id).await;
        });
    })
    .on_upgrade(move |socket| run_session(socket, state, session, rx))
    .into_response()
}

/// Per-session loop: forward queued frames, answer liveness, detect loss.
async fn run_session(
    socket: WebSocket,
    state: Arc<RelayState>,
    session: Arc<Session>,
    mut rx: mpsc::Receiver<Arc<str>>,
) {
    tracing::info!(session_id = %session.id, remote = ?session.remote_addr, "agent connected");
    let (mut ws_tx, mut ws_rx) = socket.split();

    let hello = serde_json::to_string(&ServerFrame::Connect { session: session.id.clone() });
    if let Ok(hello) = hello {
        if ws_tx.send(Message::Text(hello.into())).await.is_err() {
            finish(&state, &session, "hello send failed").await;
            return;
        }
    }

    let liveness_timeout = state.config.liveness_timeout();
    let mut ping = tokio::time::interval(state.config.ping_interval());
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping.tick().await;
    let mut last_seen = Instant::now();

    let reason = loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break "relay shutting down";
            }
            _ = session.cancel.cancelled() => break "unregistered",

            frame = rx.recv() => {
                let Some(frame) = frame else { break "queue closed" };
                if ws_tx.send(Message::Text(String::from(&*frame).into())).await.is_err() {
                    break "send failed";
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break "closed by agent",
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session.id, err = %e, "agent ws error");
                        break "transport error";
                    }
                    // Any inbound frame (pong included) proves liveness.
                    Some(Ok(_)) => last_seen = Instant::now(),
                }
            }

            _ = ping.tick() => {
                if last_seen.elapsed() > liveness_timeout {
                    session.mark_dead();
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break "liveness timeout";
                }
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break "ping failed";
                }
            }
        }
    };

    finish(&state, &session, reason).await;
}

async fn finish(state: &RelayState, session: &Session, reason: &str) {
    session.mark_dead();
    state.registry.unregister(&session.id).await;
    tracing::info!(
        session_id = %session.id,
        reason,
        connected_secs = session.connected_at.elapsed().as_secs(),
        "agent disconnected"
    );
}
