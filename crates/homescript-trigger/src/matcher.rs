// homescript-trigger/src/matcher.rs
// ============================================================================
// Module: Rule Matching
// Description: Per-rule event matching and rule-group evaluation.
// Purpose: Turn a state change into boolean rule variables and a verdict.
// Dependencies: crate::rules, homescript-lang, regex
// ============================================================================

//! ## Overview
//! Matching is pure: a state change plus a rule yields a boolean with a
//! descriptive label. Group evaluation builds the rule-variable scope,
//! strips `IF`/`END_IF` from the operator expression, and evaluates it with
//! the expression engine; an evaluation error means the group does not fire
//! and the error is recorded on the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::LazyLock;

use homescript_lang::Scope;
use homescript_lang::Value;
use homescript_lang::evaluate;
use regex::Regex;

use crate::rules::EventKind;
use crate::rules::TriggerConfig;
use crate::rules::TriggerRule;
use crate::rules::to_rule_var_name;

// ============================================================================
// SECTION: State Change
// ============================================================================

/// One `state_changed` event from the automation bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Entity that changed.
    pub entity_id: String,
    /// Previous state, when the entity existed before.
    pub old: Option<String>,
    /// New state, when the entity still exists.
    pub new: Option<String>,
}

impl StateChange {
    /// Builds a change with both endpoints present.
    #[must_use]
    pub fn new(entity_id: &str, old: &str, new: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            old: Some(old.to_string()),
            new: Some(new.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Rule Matching
// ============================================================================

/// Outcome of matching one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Whether the rule matched.
    pub matched: bool,
    /// Descriptive label, e.g. `toggled_on`.
    pub label: String,
    /// New state carried into the event payload.
    pub value: Option<String>,
}

impl RuleMatch {
    /// A non-match.
    fn miss() -> Self {
        Self {
            matched: false,
            label: String::new(),
            value: None,
        }
    }
}

/// Matches a single rule against a state change.
#[must_use]
pub fn match_rule(rule: &TriggerRule, change: &StateChange) -> RuleMatch {
    if rule.entity_id != change.entity_id {
        return RuleMatch::miss();
    }
    match rule.event_type {
        EventKind::AnyChange => {
            if change.old == change.new {
                return RuleMatch::miss();
            }
            RuleMatch {
                matched: true,
                label: "changed".to_string(),
                value: change.new.clone(),
            }
        }
        EventKind::Toggle => {
            if change.old == change.new {
                return RuleMatch::miss();
            }
            let from_ok =
                endpoint_matches(&rule.toggle_from, &rule.toggle_from_custom, change.old.as_deref());
            let to_ok =
                endpoint_matches(&rule.toggle_to, &rule.toggle_to_custom, change.new.as_deref());
            if !(from_ok && to_ok) {
                return RuleMatch::miss();
            }
            let label = match change.new.as_deref() {
                Some("on") => "toggled_on",
                Some("off") => "toggled_off",
                _ => "toggled",
            };
            RuleMatch {
                matched: true,
                label: label.to_string(),
                value: change.new.clone(),
            }
        }
        EventKind::SensorLevels => match_sensor_levels(rule, change),
    }
}

/// Checks one toggle endpoint constraint.
///
/// `any` is a wildcard and `custom` compares against the custom literal.
fn endpoint_matches(kind: &str, custom: &str, state: Option<&str>) -> bool {
    match kind {
        "any" => true,
        "custom" => state == Some(custom),
        literal => state == Some(literal),
    }
}

/// Matches a `sensor_levels` rule.
///
/// Both endpoints must parse as finite numbers. A rule matches on a strict
/// boundary crossing in either direction, or, secondarily, when the new
/// value sits at or above some level and the value changed at all. A rule
/// with zero levels can never match.
fn match_sensor_levels(rule: &TriggerRule, change: &StateChange) -> RuleMatch {
    let (Some(old), Some(new)) = (
        parse_finite(change.old.as_deref()),
        parse_finite(change.new.as_deref()),
    ) else {
        return RuleMatch::miss();
    };
    let crossed = rule.levels.iter().any(|level| {
        (old < level.value && new >= level.value) || (old > level.value && new <= level.value)
    });
    let above_and_changed =
        new != old && rule.levels.iter().any(|level| new >= level.value);
    if crossed || above_and_changed {
        RuleMatch {
            matched: true,
            label: "level_crossed".to_string(),
            value: change.new.clone(),
        }
    } else {
        RuleMatch::miss()
    }
}

/// Parses a state string into a finite number.
fn parse_finite(state: Option<&str>) -> Option<f64> {
    state
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|number| number.is_finite())
}

// ============================================================================
// SECTION: Group Evaluation
// ============================================================================

/// Standalone `IF` / `END_IF` tokens stripped from rule expressions.
static IF_TOKENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bEND_IF\b|\bIF\b").unwrap_or_else(|_| unreachable!()));

/// Outcome of evaluating one script's rule group against a change.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    /// Whether the group fires.
    pub fired: bool,
    /// Rule display name to matched flag.
    pub matches: BTreeMap<String, bool>,
    /// Rule variable name to matched flag.
    pub rule_vars: BTreeMap<String, bool>,
    /// Expression failure, when evaluation failed.
    pub expression_error: Option<String>,
    /// Label of the first matching rule, empty when none matched.
    pub name: String,
    /// New state of the first matching rule.
    pub value: Option<String>,
}

/// Evaluates a rule group against a state change.
#[must_use]
pub fn evaluate_rule_group(config: &TriggerConfig, change: &StateChange) -> GroupOutcome {
    let mut matches = BTreeMap::new();
    let mut rule_vars = BTreeMap::new();
    let mut name = String::new();
    let mut value = None;
    let mut any_matched = false;

    for rule in &config.rules {
        let outcome = match_rule(rule, change);
        matches.insert(rule.name.clone(), outcome.matched);
        rule_vars.insert(to_rule_var_name(&rule.name), outcome.matched);
        if outcome.matched && !any_matched {
            name = outcome.label;
            value = outcome.value;
            any_matched = true;
        } else if outcome.matched {
            any_matched = true;
        }
    }

    let expression = IF_TOKENS_RE
        .replace_all(&config.rule_expression, " ")
        .trim()
        .to_string();

    let (fired, expression_error) = if expression.is_empty() {
        (any_matched, None)
    } else {
        let scope: Scope = rule_vars
            .iter()
            .map(|(var, matched)| (var.clone(), Value::Bool(*matched)))
            .collect();
        match evaluate(&expression, &scope) {
            Ok(result) => (result.truthy(), None),
            Err(err) => (false, Some(err.to_string())),
        }
    };

    GroupOutcome {
        fired,
        matches,
        rule_vars,
        expression_error,
        name,
        value,
    }
}
