// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook ingress: normalize a producer payload and fan it out.

use crate::error::RelayError;
use crate::event::Event;
use crate::registry::{DeliveryReport, Registry};

/// An event that passed normalization, with the outcome of its fan-out.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub event: Event,
    pub report: DeliveryReport,
}

/// Accept a raw webhook body and broadcast it to every live session.
///
/// Rejection happens before any session is touched. Partial delivery is
/// reported, never returned as an error.
pub async fn accept(registry: &Registry, raw: &[u8]) -> Result<Accepted, RelayError> {
    let event = Event::from_slice(raw)?;
    tracing::info!(title = %event.title(), fields = event.payload().len(), "webhook received");

    let report = registry.broadcast(&event).await;
    tracing::info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        "notification fanned out"
    );
    Ok(Accepted { event, report })
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod tests;
