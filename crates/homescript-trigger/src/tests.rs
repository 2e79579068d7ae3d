// homescript-trigger/src/tests.rs
// ============================================================================
// Test Module: Trigger Internals
// Coverage: Variable naming, websocket URL derivation, bus message parsing.
// ============================================================================

//! ## Overview
//! Unit tests for pure trigger helpers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use crate::engine::BusMessage;
use crate::engine::TriggerEngineConfig;
use crate::engine::parse_bus_message;
use crate::matcher::StateChange;
use crate::rules::to_rule_var_name;

// ========================================================================
// Variable Naming
// ========================================================================

#[test]
fn rule_var_names_are_uppercased() {
    assert_eq!(to_rule_var_name("A"), "A");
    assert_eq!(to_rule_var_name("kitchen light"), "KITCHEN_LIGHT");
    assert_eq!(to_rule_var_name("power-draw"), "POWER_DRAW");
    assert_eq!(to_rule_var_name("already_ok"), "ALREADY_OK");
}

#[test]
fn leading_digits_gain_a_prefix() {
    assert_eq!(to_rule_var_name("2nd floor"), "RULE_2ND_FLOOR");
    assert_eq!(to_rule_var_name("9"), "RULE_9");
}

// ========================================================================
// Websocket URL
// ========================================================================

#[test]
fn websocket_url_mirrors_the_http_scheme() {
    let http = TriggerEngineConfig::new("http://ha.local:8123", "t");
    assert_eq!(http.websocket_url(), "ws://ha.local:8123/api/websocket");
    let https = TriggerEngineConfig::new("https://ha.example/", "t");
    assert_eq!(https.websocket_url(), "wss://ha.example/api/websocket");
}

// ========================================================================
// Bus Messages
// ========================================================================

#[test]
fn handshake_messages_parse() {
    assert_eq!(
        parse_bus_message(r#"{"type":"auth_required","ha_version":"2024.6"}"#),
        BusMessage::AuthRequired
    );
    assert_eq!(parse_bus_message(r#"{"type":"auth_ok"}"#), BusMessage::AuthOk);
    assert_eq!(
        parse_bus_message(r#"{"type":"auth_invalid","message":"nope"}"#),
        BusMessage::AuthInvalid
    );
}

#[test]
fn state_changed_events_parse() {
    let text = r#"{
        "id": 1,
        "type": "event",
        "event": {
            "event_type": "state_changed",
            "data": {
                "entity_id": "light.kitchen",
                "old_state": {"state": "off"},
                "new_state": {"state": "on"}
            }
        }
    }"#;
    assert_eq!(
        parse_bus_message(text),
        BusMessage::Event(StateChange::new("light.kitchen", "off", "on"))
    );
}

#[test]
fn missing_states_parse_as_none() {
    let text = r#"{
        "type": "event",
        "event": {
            "data": {
                "entity_id": "sensor.new",
                "old_state": null,
                "new_state": {"state": "1"}
            }
        }
    }"#;
    let BusMessage::Event(change) = parse_bus_message(text) else {
        panic!("expected an event");
    };
    assert_eq!(change.old, None);
    assert_eq!(change.new.as_deref(), Some("1"));
}

#[test]
fn garbage_frames_are_ignored() {
    assert_eq!(parse_bus_message("not json"), BusMessage::Other);
    assert_eq!(parse_bus_message(r#"{"type":"result"}"#), BusMessage::Other);
}
