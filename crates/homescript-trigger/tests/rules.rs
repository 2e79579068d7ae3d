// homescript-trigger/tests/rules.rs
// ============================================================================
// Test Module: Trigger Config Normalization
// Coverage: Defaults, dedup, level coercion, idempotence law.
// ============================================================================

//! ## Overview
//! Integration tests for trigger-config normalization.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use homescript_trigger::EventKind;
use homescript_trigger::GroupLogic;
use homescript_trigger::TriggerConfig;
use homescript_trigger::normalize_trigger_config;
use proptest::prelude::*;

#[test]
fn defaults_fill_missing_fields() {
    let raw = serde_json::json!({
        "rules": [{"name": "A", "entityId": "light.kitchen"}],
    });
    let config = TriggerConfig::from_value(&raw);
    assert_eq!(config.logic, GroupLogic::And);
    assert_eq!(config.rule_expression, "");
    assert_eq!(config.rules.len(), 1);
    let rule = &config.rules[0];
    assert_eq!(rule.event_type, EventKind::AnyChange);
    assert_eq!(rule.toggle_from, "any");
    assert_eq!(rule.toggle_to, "any");
    assert!(rule.levels.is_empty());
}

#[test]
fn duplicate_rule_ids_keep_the_first() {
    let raw = serde_json::json!({
        "rules": [
            {"id": "r1", "name": "first", "entityId": "a.b"},
            {"id": "r1", "name": "second", "entityId": "c.d"},
            {"id": "r2", "name": "third", "entityId": "e.f"},
        ],
    });
    let config = TriggerConfig::from_value(&raw);
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].name, "first");
    assert_eq!(config.rules[1].name, "third");
}

#[test]
fn level_values_coerce_or_drop() {
    let raw = serde_json::json!({
        "rules": [{
            "id": "r1",
            "eventType": "sensor_levels",
            "entityId": "sensor.power",
            "levels": [
                {"id": "l1", "name": "high", "value": 1000},
                {"id": "l2", "name": "text", "value": "250.5"},
                {"id": "l3", "name": "bogus", "value": "not a number"},
            ],
        }],
    });
    let config = TriggerConfig::from_value(&raw);
    let levels = &config.rules[0].levels;
    assert_eq!(levels.len(), 2);
    assert!((levels[0].value - 1000.0).abs() < f64::EPSILON);
    assert!((levels[1].value - 250.5).abs() < f64::EPSILON);
}

#[test]
fn or_logic_is_recognized_case_insensitively() {
    let config = TriggerConfig::from_value(&serde_json::json!({"logic": "or"}));
    assert_eq!(config.logic, GroupLogic::Or);
}

#[test]
fn normalization_is_idempotent_on_handwritten_inputs() {
    for raw in [
        serde_json::json!(null),
        serde_json::json!("not an object"),
        serde_json::json!({}),
        serde_json::json!({"logic": "OR", "ruleExpression": "A AND B"}),
        serde_json::json!({"rules": "not an array"}),
        serde_json::json!({"rules": [{"levels": [{"value": 5}]}]}),
    ] {
        let once = normalize_trigger_config(&raw);
        let twice = normalize_trigger_config(&once);
        assert_eq!(once, twice, "normalization not idempotent for {raw}");
    }
}

// ========================================================================
// Idempotence Law
// ========================================================================

/// Arbitrary shallow JSON for the normalization law.
fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i32>().prop_map(serde_json::Value::from),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            prop::collection::btree_map("[a-zA-Z]{1,10}", inner, 0..4).prop_map(|map| {
                serde_json::Value::Object(map.into_iter().collect())
            }),
        ]
    })
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in arb_json()) {
        let once = normalize_trigger_config(&raw);
        let twice = normalize_trigger_config(&once);
        prop_assert_eq!(once, twice);
    }
}
