// homescript-lang/src/tests.rs
// ============================================================================
// Test Module: Language Internals
// Coverage: Value coercion, lexer behavior, interpolation, line joining.
// ============================================================================

//! ## Overview
//! Unit tests for the value model, lexer, and logical-line reader.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions."
)]

use crate::expr::evaluate;
use crate::expr::interpolate;
use crate::lines::logical_lines;
use crate::token::Token;
use crate::token::lex;
use crate::value::Scope;
use crate::value::Value;

// ========================================================================
// Value Coercion
// ========================================================================

#[test]
fn whole_numbers_print_without_decimal() {
    assert_eq!(Value::Number(5.0).string_form(), "5");
    assert_eq!(Value::Number(2.5).string_form(), "2.5");
    assert_eq!(Value::Number(-3.0).string_form(), "-3");
}

#[test]
fn truthiness_matches_script_semantics() {
    assert!(!Value::Null.truthy());
    assert!(!Value::String(String::new()).truthy());
    assert!(!Value::Number(0.0).truthy());
    assert!(Value::String("false".to_string()).truthy());
    assert!(Value::Array(Vec::new()).truthy());
}

#[test]
fn loose_equality_coerces_numbers() {
    assert!(Value::Number(5.0).loose_eq(&Value::String("5".to_string())));
    assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));
    assert!(!Value::Null.loose_eq(&Value::String(String::new())));
}

#[test]
fn scope_path_walks_objects_and_arrays() {
    let mut scope = Scope::new();
    scope.set(
        "payload",
        Value::from_json(&serde_json::json!({"inner": {"list": [10, 20]}})),
    );
    let path = ["payload", "inner", "list", "1"].map(str::to_string);
    assert_eq!(scope.get_path(&path), Value::Number(20.0));
    let missing = ["payload", "nope", "deep"].map(str::to_string);
    assert_eq!(scope.get_path(&missing), Value::Null);
}

// ========================================================================
// Lexer
// ========================================================================

#[test]
fn single_equals_promotes_to_equality() {
    let tokens = lex("$a = 5").unwrap();
    assert!(tokens.contains(&Token::Eq));
    let double = lex("$a == 5").unwrap();
    assert_eq!(tokens.len(), double.len());
}

#[test]
fn word_operators_are_case_insensitive() {
    let tokens = lex("true and not false or x in y").unwrap();
    assert!(tokens.contains(&Token::And));
    assert!(tokens.contains(&Token::Not));
    assert!(tokens.contains(&Token::Or));
    assert!(tokens.contains(&Token::In));
}

#[test]
fn dotted_variables_lex_as_paths() {
    let tokens = lex("$a.b.c").unwrap();
    assert_eq!(
        tokens,
        vec![Token::Var(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string()
        ])]
    );
}

#[test]
fn unterminated_string_is_rejected() {
    assert!(lex("\"open").is_err());
}

// ========================================================================
// Interpolation
// ========================================================================

#[test]
fn interpolation_substitutes_scope_paths() {
    let mut scope = Scope::new();
    scope.set("mode", Value::from("night"));
    scope.set(
        "target",
        Value::from_json(&serde_json::json!({"temp": 22})),
    );
    assert_eq!(
        interpolate("mode=$mode temp=$target.temp", &scope),
        "mode=night temp=22"
    );
}

#[test]
fn interpolation_leaves_non_identifiers_alone() {
    let scope = Scope::new();
    assert_eq!(interpolate("cost: $5 and $-x", &scope), "cost: $5 and $-x");
}

#[test]
fn missing_variables_interpolate_empty() {
    let scope = Scope::new();
    assert_eq!(interpolate("[$absent]", &scope), "[]");
}

// ========================================================================
// Logical Lines
// ========================================================================

#[test]
fn comments_and_blanks_are_skipped() {
    let lines = logical_lines("# header\n\nPRINT 1\n   \nPRINT 2\n");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].number, 3);
    assert_eq!(lines[1].number, 5);
}

#[test]
fn if_conditions_join_on_dangling_operator() {
    let source = "IF $a > 1 AND\n   $b < 2\n  PRINT \"x\"\nEND_IF\n";
    let lines = logical_lines(source);
    assert_eq!(lines[0].text, "IF $a > 1 AND $b < 2");
    assert_eq!(lines[0].number, 1);
}

#[test]
fn if_conditions_join_on_leading_operator() {
    let source = "IF $a > 1\nOR $b < 2\n  PRINT \"x\"\nEND_IF\n";
    let lines = logical_lines(source);
    assert_eq!(lines[0].text, "IF $a > 1 OR $b < 2");
}

#[test]
fn joining_stops_at_statement_keywords() {
    let source = "IF $a\nPRINT \"x\"\nEND_IF\n";
    let lines = logical_lines(source);
    assert_eq!(lines[0].text, "IF $a");
    assert_eq!(lines.len(), 3);
}

// ========================================================================
// Evaluation Smoke
// ========================================================================

#[test]
fn evaluate_is_referentially_transparent() {
    let mut scope = Scope::new();
    scope.set("x", Value::Number(4.0));
    let first = evaluate("sqrt($x) + 1", &scope).unwrap();
    let second = evaluate("sqrt($x) + 1", &scope).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Value::Number(3.0));
}
