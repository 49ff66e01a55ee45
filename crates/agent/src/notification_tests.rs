// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn notification(value: Value) -> Notification {
    match value {
        Value::Object(map) => Notification::new(map),
        _ => Notification::new(Map::new()),
    }
}

#[test]
fn title_and_body_from_fields() {
    let n = notification(json!({"title": "OTP", "message": "123456"}));
    assert_eq!(n.title(), "OTP");
    assert_eq!(n.body(), "123456");
}

#[test]
fn empty_payload_uses_fallbacks() {
    let n = notification(json!({}));
    assert_eq!(n.title(), FALLBACK_TITLE);
    assert_eq!(n.body(), "{}");
}

#[test]
fn body_falls_back_to_structural_rendering() {
    let n = notification(json!({"code": 42}));
    assert_eq!(n.body(), r#"{"code":42}"#);
}

#[test]
fn parses_notification_frame() {
    let frame = parse_frame(r#"{"event":"notification","data":{"title":"T","message":"M"}}"#);
    let expected = notification(json!({"title": "T", "message": "M"}));
    assert_eq!(frame, Some(ServerFrame::Notification(expected)));
}

#[test]
fn parses_connect_frame() {
    let frame = parse_frame(r#"{"event":"connect","data":{"session":"abc"}}"#);
    assert_eq!(frame, Some(ServerFrame::Connect { session: "abc".to_owned() }));
}

#[yare::parameterized(
    unknown_event = { r#"{"event":"bogus","data":{}}"# },
    non_object_data = { r#"{"event":"notification","data":[1]}"# },
    not_json = { "hello" },
)]
fn ignores_unrecognized_frames(text: &str) {
    assert_eq!(parse_frame(text), None);
}
