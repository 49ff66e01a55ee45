// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket client for the relay's push channel.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::connection::{BoxFuture, Connector, Incoming, Link};
use crate::error::AgentError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials the relay with tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, AgentError>> {
        Box::pin(async move {
            let (stream, _) = tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
            Ok(Box::new(WsLink { stream }) as Box<dyn Link>)
        })
    }
}

pub struct WsLink {
    stream: WsStream,
}

impl Link for WsLink {
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Incoming>, AgentError>> {
        Box::pin(async move {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => Ok(Some(Incoming::Text(text.as_str().to_owned()))),
                // Pings are answered by tungstenite on the next read or write.
                Some(Ok(Message::Close(_))) => Ok(None),
                Some(Ok(_)) => Ok(Some(Incoming::Activity)),
                Some(Err(e)) => Err(AgentError::Transport(e.to_string())),
                None => Ok(None),
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.close(None).await {
                tracing::debug!(err = %e, "websocket close failed");
            }
        })
    }
}
