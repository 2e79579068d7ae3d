// homescript-lang/src/value.rs
// ============================================================================
// Module: HomeScript Runtime Values
// Description: Tagged value model and variable scope.
// Purpose: Represent dynamically typed script values with explicit coercion.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! HomeScript is dynamically typed. [`Value`] is the discriminated union the
//! interpreter works with; all coercion (truthiness, numeric, string form) is
//! explicit and happens at operator boundaries, never implicitly inside the
//! host. [`Scope`] is the variable table with dotted-path lookup; a missing
//! intermediate path yields [`Value::Null`], never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;

// ============================================================================
// SECTION: Value
// ============================================================================

/// A dynamically typed HomeScript value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent or explicit null.
    Null,
    /// Boolean literal or comparison result.
    Bool(bool),
    /// All numbers are IEEE 754 doubles.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// String-keyed object with deterministic key order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the truthiness used by `IF`, `WHILE`, and validators.
    ///
    /// Empty strings, zero, NaN, and null are falsy; everything else is
    /// truthy. Arrays and objects are truthy even when empty.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Attempts numeric coercion.
    ///
    /// Booleans coerce to 0/1 and strings parse as doubles; null, arrays,
    /// and objects have no numeric form.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Self::String(value) => value.trim().parse::<f64>().ok(),
            Self::Null | Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Returns the canonical string form used by `PRINT`, `IN`, and
    /// interpolation.
    ///
    /// Whole numbers print without a decimal point; arrays and objects
    /// serialize as JSON.
    #[must_use]
    pub fn string_form(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::String(value) => value.clone(),
            Self::Array(_) | Self::Object(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_default()
            }
        }
    }

    /// Loose equality with numeric coercion.
    ///
    /// When both sides coerce to numbers the comparison is numeric;
    /// otherwise the string forms are compared.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        match (self.as_number(), other.as_number()) {
            (Some(left), Some(right)) => left == right,
            _ => self.string_form() == other.string_form(),
        }
    }

    /// Loose ordering with numeric coercion, falling back to string order.
    #[must_use]
    pub fn loose_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self.as_number(), other.as_number()) {
            (Some(left), Some(right)) => left.partial_cmp(&right),
            _ => Some(self.string_form().cmp(&other.string_form())),
        }
    }

    /// Converts to a `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(value) => number_to_json(*value),
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Builds a value from a `serde_json::Value`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(*value),
            serde_json::Value::Number(value) => Self::Number(value.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(value) => Self::String(value.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_form())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Converts a double to JSON, preserving whole numbers as integers.
fn number_to_json(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 9_007_199_254_740_992.0 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "fract()==0 and magnitude bounded above"
        )]
        let whole = value as i64;
        serde_json::Value::Number(Number::from(whole))
    } else {
        Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Formats a double the way script authors expect: whole numbers without a
/// trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Variable table for a single run.
///
/// Names are stored without the `$` sigil. Key order is deterministic so
/// report snapshots and debugger views are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope {
    /// Backing map from variable name to value.
    vars: BTreeMap<String, Value>,
}

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable by bare name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Assigns a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Returns true when the variable is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Walks a dotted path such as `a.b.c`.
    ///
    /// A missing intermediate segment yields [`Value::Null`]; numeric
    /// segments index into arrays.
    #[must_use]
    pub fn get_path(&self, path: &[String]) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return Value::Null;
        };
        let mut current = match self.vars.get(first) {
            Some(value) => value.clone(),
            None => return Value::Null,
        };
        for segment in rest {
            current = match &current {
                Value::Object(entries) => {
                    entries.get(segment).cloned().unwrap_or(Value::Null)
                }
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        current
    }

    /// Iterates over all variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true when no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Converts the scope to a JSON object for reports.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.vars
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Scope {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
