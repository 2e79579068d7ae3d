// homescript-core/src/enums.rs
// ============================================================================
// Module: Builtin Enum Catalog
// Description: The constant `ENUMS` catalog injected into every run scope.
// Purpose: Give scripts stable names for common Home Assistant states.
// Dependencies: homescript-lang
// ============================================================================

//! ## Overview
//! `$ENUMS.state.on` and friends spare script authors from magic strings.
//! The catalog is constant per process; scripts can read but reassignments
//! only affect their own run scope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use homescript_lang::Value;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Common state names keyed under `state`.
const STATES: &[(&str, &str)] = &[
    ("on", "on"),
    ("off", "off"),
    ("home", "home"),
    ("not_home", "not_home"),
    ("open", "open"),
    ("closed", "closed"),
    ("locked", "locked"),
    ("unlocked", "unlocked"),
    ("idle", "idle"),
    ("playing", "playing"),
    ("paused", "paused"),
    ("unavailable", "unavailable"),
    ("unknown", "unknown"),
];

/// Builds the `ENUMS` value for a run scope.
#[must_use]
pub fn builtin_enums() -> Value {
    let state: BTreeMap<String, Value> = STATES
        .iter()
        .map(|(name, value)| ((*name).to_string(), Value::from(*value)))
        .collect();
    let mut catalog = BTreeMap::new();
    catalog.insert("state".to_string(), Value::Object(state));
    Value::Object(catalog)
}
