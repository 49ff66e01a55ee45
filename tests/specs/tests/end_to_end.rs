// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end: producer POST → relay fan-out → agent connection loop →
//! delivery pipeline.

use std::time::Duration;

use serde_json::json;

use hookcast::connection::ConnectionState;
use hookcast::delivery::{ToastDuration, COPIED_SUFFIX};
use hookcast_specs::{Agent, Relay, TIMEOUT};

#[tokio::test]
async fn otp_reaches_single_agent_once() -> anyhow::Result<()> {
    let relay = Relay::start().await?;
    let agent = Agent::attach(&relay).await?;
    agent.wait_connected().await?;
    relay.wait_for_sessions(1).await?;

    let resp = relay.post(&json!({"title": "OTP", "message": "123456"})).await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<serde_json::Value>().await?, json!({"status": "success"}));

    let toasts = agent.wait_for_toasts(1).await?;
    // Give a duplicate the chance to show up before asserting there is none.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(agent.desktop.toasts().len(), 1);
    assert_eq!(toasts[0].title, "OTP");
    assert_eq!(toasts[0].body, format!("123456\n\n{COPIED_SUFFIX}"));
    assert_eq!(toasts[0].duration, ToastDuration::Long);
    assert_eq!(agent.desktop.clipboard(), vec!["123456".to_owned()]);

    agent.stop().await?;
    Ok(())
}

#[tokio::test]
async fn zero_agents_still_succeeds_for_producer() -> anyhow::Result<()> {
    let relay = Relay::start().await?;

    let resp = relay.post(&json!({"title": "OTP", "message": "123456"})).await?;
    assert_eq!(resp.status(), 200);

    let accepted = hookrelay::ingress::accept(&relay.state.registry, br#"{"title":"OTP"}"#).await?;
    assert_eq!(accepted.report.attempted, 0);
    assert_eq!(accepted.report.succeeded, 0);
    assert_eq!(accepted.report.failed, 0);
    Ok(())
}

#[tokio::test]
async fn every_attached_agent_gets_the_event() -> anyhow::Result<()> {
    let relay = Relay::start().await?;
    let first = Agent::attach(&relay).await?;
    let second = Agent::attach(&relay).await?;
    first.wait_connected().await?;
    second.wait_connected().await?;
    relay.wait_for_sessions(2).await?;

    relay.post(&json!({"deploy": "done", "build": 42})).await?.error_for_status()?;

    for agent in [&first, &second] {
        let toasts = agent.wait_for_toasts(1).await?;
        assert_eq!(toasts[0].title, "New notification");
        // Body is the payload's JSON, followed by the clipboard suffix.
        let (rendered, suffix) = toasts[0]
            .body
            .split_once("\n\n")
            .ok_or_else(|| anyhow::anyhow!("no suffix in {:?}", toasts[0].body))?;
        assert_eq!(suffix, COPIED_SUFFIX);
        let rendered: serde_json::Value = serde_json::from_str(rendered)?;
        assert_eq!(rendered, json!({"deploy": "done", "build": 42}));
    }

    first.stop().await?;
    second.stop().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_payload_is_rejected_and_not_pushed() -> anyhow::Result<()> {
    let relay = Relay::start().await?;
    let agent = Agent::attach(&relay).await?;
    agent.wait_connected().await?;
    relay.wait_for_sessions(1).await?;

    let resp = relay.post(&json!(["not", "an", "object"])).await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"]["code"], "MALFORMED_PAYLOAD");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(agent.desktop.toasts().is_empty());
    agent.stop().await?;
    Ok(())
}

#[tokio::test]
async fn stopped_agent_leaves_the_registry() -> anyhow::Result<()> {
    let relay = Relay::start().await?;
    let agent = Agent::attach(&relay).await?;
    agent.wait_connected().await?;
    relay.wait_for_sessions(1).await?;

    agent.stop().await?;
    relay.wait_for_sessions(0).await?;

    let resp = relay.post(&json!({"message": "nobody home"})).await?;
    assert_eq!(resp.status(), 200);
    Ok(())
}

#[tokio::test]
async fn agent_recovers_after_relay_restart() -> anyhow::Result<()> {
    let relay = Relay::start().await?;
    let addr = relay.addr;
    let agent = Agent::attach(&relay).await?;
    agent.wait_connected().await?;

    drop(relay);
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while agent.status.state() == ConnectionState::Connected {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "agent never noticed the relay going away");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // The old listener may take a moment to release the port.
    let relay = loop {
        match Relay::start_on(addr).await {
            Ok(relay) => break relay,
            Err(e) => {
                anyhow::ensure!(tokio::time::Instant::now() < deadline, "cannot rebind {addr}: {e}");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    };
    agent.wait_connected().await?;
    relay.wait_for_sessions(1).await?;

    relay.post(&json!({"title": "back", "message": "again"})).await?.error_for_status()?;
    let toasts = agent.wait_for_toasts(1).await?;
    assert_eq!(toasts[0].title, "back");

    agent.stop().await?;
    Ok(())
}
