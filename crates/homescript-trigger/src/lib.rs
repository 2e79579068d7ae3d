// homescript-trigger/src/lib.rs
// ============================================================================
// Module: HomeScript Trigger Root
// Description: Public API surface for the event-trigger engine.
// Purpose: Wire together rule models, matching, and the bus subscriber.
// Dependencies: crate::{engine, matcher, rules}
// ============================================================================

//! ## Overview
//! The trigger engine subscribes to the Home Assistant `state_changed`
//! stream, maps each event onto per-rule boolean variables, evaluates each
//! script's rule-group expression over those variables, and dispatches
//! matching scripts through the execution host with the event payload bound
//! in scope.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod engine;
pub mod matcher;
pub mod rules;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::BusMessage;
pub use engine::EngineError;
pub use engine::NoopTriggerSink;
pub use engine::RECONNECT_DELAY;
pub use engine::StderrTriggerSink;
pub use engine::TriggerEngine;
pub use engine::TriggerEngineConfig;
pub use engine::TriggerEngineEvent;
pub use engine::TriggerSink;
pub use engine::build_event_payload;
pub use engine::parse_bus_message;
pub use matcher::GroupOutcome;
pub use matcher::RuleMatch;
pub use matcher::StateChange;
pub use matcher::evaluate_rule_group;
pub use matcher::match_rule;
pub use rules::EventKind;
pub use rules::GroupLogic;
pub use rules::SensorLevel;
pub use rules::TriggerConfig;
pub use rules::TriggerRule;
pub use rules::normalize_trigger_config;
pub use rules::to_rule_var_name;
