// homescript-trigger/src/rules.rs
// ============================================================================
// Module: Trigger Rule Model
// Description: Rule-group config, tolerant normalization, variable naming.
// Purpose: Give every stored trigger config one canonical, stable shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Trigger configs arrive as operator-edited JSON. [`normalize_trigger_config`]
//! accepts arbitrary JSON, fills defaults, coerces level values, drops
//! duplicate rule ids, and produces a canonical form; normalizing twice
//! yields the same result. Each rule contributes one boolean variable named
//! by [`to_rule_var_name`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Group combinator recorded on the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupLogic {
    /// All rules.
    #[default]
    #[serde(rename = "AND")]
    And,
    /// Any rule.
    #[serde(rename = "OR")]
    Or,
}

/// What kind of state change a rule watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Any old ≠ new transition.
    #[default]
    AnyChange,
    /// A transition between two constrained endpoints.
    Toggle,
    /// Numeric level boundary crossings.
    SensorLevels,
}

/// One named sensor level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLevel {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Numeric threshold.
    pub value: f64,
}

/// One trigger rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRule {
    /// Stable identifier, unique within the config.
    pub id: String,
    /// Display name; the source of the rule variable name.
    pub name: String,
    /// Watched entity.
    pub entity_id: String,
    /// Watched transition kind.
    pub event_type: EventKind,
    /// Toggle source constraint: `any`, `custom`, or a literal state.
    pub toggle_from: String,
    /// Toggle target constraint: `any`, `custom`, or a literal state.
    pub toggle_to: String,
    /// Literal used when `toggle_from` is `custom`.
    pub toggle_from_custom: String,
    /// Literal used when `toggle_to` is `custom`.
    pub toggle_to_custom: String,
    /// UI preview scale for levels.
    pub preview_scale: f64,
    /// Sensor levels; a `sensor_levels` rule with none can never match.
    pub levels: Vec<SensorLevel>,
    /// Lower bound of the level range.
    pub range_min: f64,
    /// Upper bound of the level range.
    pub range_max: f64,
}

/// One rule group bound to a script.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    /// Group combinator.
    pub logic: GroupLogic,
    /// Boolean expression over rule variables; empty means "any match".
    pub rule_expression: String,
    /// The rules.
    pub rules: Vec<TriggerRule>,
}

impl TriggerConfig {
    /// Parses arbitrary JSON into the canonical config.
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let logic = match raw.get("logic").and_then(Value::as_str) {
            Some(text) if text.eq_ignore_ascii_case("or") => GroupLogic::Or,
            _ => GroupLogic::And,
        };
        let rule_expression = raw
            .get("ruleExpression")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut rules = Vec::new();
        let mut seen_ids: Vec<String> = Vec::new();
        if let Some(entries) = raw.get("rules").and_then(Value::as_array) {
            for (index, entry) in entries.iter().enumerate() {
                let rule = normalize_rule(entry, index);
                if seen_ids.contains(&rule.id) {
                    continue;
                }
                seen_ids.push(rule.id.clone());
                rules.push(rule);
            }
        }
        Self {
            logic,
            rule_expression,
            rules,
        }
    }

    /// Serializes the canonical config back to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Returns true when the config has no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Extracts a string field with a default.
fn string_field(raw: &Value, field: &str, default: &str) -> String {
    raw.get(field)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Extracts a numeric field, accepting numeric strings, with a default.
fn number_field(raw: &Value, field: &str, default: f64) -> f64 {
    match raw.get(field) {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(default),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Normalizes a single rule entry.
fn normalize_rule(raw: &Value, index: usize) -> TriggerRule {
    let id = {
        let explicit = string_field(raw, "id", "");
        if explicit.is_empty() {
            format!("rule-{index}")
        } else {
            explicit
        }
    };
    let name = {
        let explicit = string_field(raw, "name", "");
        if explicit.is_empty() { id.clone() } else { explicit }
    };
    let event_type = match raw.get("eventType").and_then(Value::as_str) {
        Some("toggle") => EventKind::Toggle,
        Some("sensor_levels") => EventKind::SensorLevels,
        _ => EventKind::AnyChange,
    };
    let levels = raw
        .get("levels")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(level_index, entry)| normalize_level(entry, level_index))
                .collect()
        })
        .unwrap_or_default();
    TriggerRule {
        id,
        name,
        entity_id: string_field(raw, "entityId", ""),
        event_type,
        toggle_from: string_field(raw, "toggleFrom", "any"),
        toggle_to: string_field(raw, "toggleTo", "any"),
        toggle_from_custom: string_field(raw, "toggleFromCustom", ""),
        toggle_to_custom: string_field(raw, "toggleToCustom", ""),
        preview_scale: number_field(raw, "previewScale", 100.0),
        levels,
        range_min: number_field(raw, "rangeMin", 0.0),
        range_max: number_field(raw, "rangeMax", 100.0),
    }
}

/// Normalizes a level entry; non-numeric values drop the entry.
fn normalize_level(raw: &Value, index: usize) -> Option<SensorLevel> {
    let value = match raw.get("value") {
        Some(Value::Number(number)) => number.as_f64()?,
        Some(Value::String(text)) => text.trim().parse().ok()?,
        _ => return None,
    };
    let id = {
        let explicit = string_field(raw, "id", "");
        if explicit.is_empty() {
            format!("level-{index}")
        } else {
            explicit
        }
    };
    Some(SensorLevel {
        id: id.clone(),
        name: {
            let explicit = string_field(raw, "name", "");
            if explicit.is_empty() { id } else { explicit }
        },
        value,
    })
}

/// Normalizes arbitrary JSON into canonical trigger-config JSON.
///
/// Idempotent: `normalize(normalize(c)) == normalize(c)` for all inputs.
#[must_use]
pub fn normalize_trigger_config(raw: &Value) -> Value {
    TriggerConfig::from_value(raw).to_value()
}

// ============================================================================
// SECTION: Variable Naming
// ============================================================================

/// Maps a rule name to its boolean variable name.
///
/// Uppercase, non-identifier characters become `_`, and a leading digit
/// gains a `RULE_` prefix.
#[must_use]
pub fn to_rule_var_name(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out = format!("RULE_{out}");
    }
    out
}
