// homescript-lang/tests/interpreter.rs
// ============================================================================
// Test Module: Interpreter
// Coverage: Statement semantics, control flow, functions, imports, limits.
// ============================================================================

//! ## Overview
//! Integration tests for interpreter execution, including the documented
//! end-to-end scenarios and boundary behaviors.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions."
)]

mod support;

use std::collections::BTreeMap;

use homescript_lang::ExecutionFailure;
use homescript_lang::ExecutionResult;
use homescript_lang::Interpreter;
use homescript_lang::InterpreterOptions;
use homescript_lang::Value;
use support::TestHost;

/// Runs a script against a dry-run recording host.
async fn run(source: &str) -> Result<ExecutionResult, ExecutionFailure> {
    let host = TestHost::default();
    Interpreter::new(&host, InterpreterOptions::default())
        .execute(source)
        .await
}

/// Runs a script with preset query parameters.
async fn run_with_params(
    source: &str,
    params: &[(&str, serde_json::Value)],
) -> Result<ExecutionResult, ExecutionFailure> {
    let host = TestHost::default();
    let query_params: BTreeMap<String, Value> = params
        .iter()
        .map(|(name, json)| ((*name).to_string(), Value::from_json(json)))
        .collect();
    let options = InterpreterOptions {
        query_params,
        ..InterpreterOptions::default()
    };
    Interpreter::new(&host, options).execute(source).await
}

// ========================================================================
// Branching
// ========================================================================

#[tokio::test]
async fn simple_branch_takes_true_arm() {
    let source = "SET $x = 5\nIF $x > 3\n  PRINT \"Greater\"\nELSE\n  PRINT \"Lesser\"\nEND_IF\n";
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["Greater".to_string()]);
    assert_eq!(result.variables.get("x"), Some(&Value::Number(5.0)));
}

#[tokio::test]
async fn else_if_chains_evaluate_in_order() {
    let source = concat!(
        "SET $x = 2\n",
        "IF $x = 1\n",
        "  PRINT \"one\"\n",
        "ELSE IF $x = 2\n",
        "  PRINT \"two\"\n",
        "ELSE IF $x = 3\n",
        "  PRINT \"three\"\n",
        "ELSE\n",
        "  PRINT \"other\"\n",
        "END_IF\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["two".to_string()]);
}

#[tokio::test]
async fn nested_if_blocks_resolve() {
    let source = concat!(
        "SET $a = 1\n",
        "IF $a = 1\n",
        "  IF $a < 0\n",
        "    PRINT \"inner-no\"\n",
        "  ELSE\n",
        "    PRINT \"inner-yes\"\n",
        "  END_IF\n",
        "END_IF\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["inner-yes".to_string()]);
}

// ========================================================================
// Loops
// ========================================================================

#[tokio::test]
async fn while_loop_with_break_stops_early() {
    let source = concat!(
        "SET $i = 0\n",
        "WHILE $i < 10 DO\n",
        "  IF $i = 3\n",
        "    BREAK\n",
        "  END_IF\n",
        "  PRINT $i\n",
        "  SET $i = $i + 1\n",
        "END_WHILE\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["0", "1", "2"]);
}

#[tokio::test]
async fn continue_skips_to_next_iteration() {
    let source = concat!(
        "SET $i = 0\n",
        "WHILE $i < 4 DO\n",
        "  SET $i = $i + 1\n",
        "  IF $i = 2\n",
        "    CONTINUE\n",
        "  END_IF\n",
        "  PRINT $i\n",
        "END_WHILE\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["1", "3", "4"]);
}

#[tokio::test]
async fn infinite_loop_is_detected() {
    let source = "WHILE TRUE DO\nSET $x = 1\nEND_WHILE\n";
    let err = run(source).await.unwrap_err();
    assert_eq!(err.error.message, "Infinite loop detected");
    assert_eq!(err.error.line, Some(1));
}

// ========================================================================
// Parameter Declarations
// ========================================================================

#[tokio::test]
async fn missing_required_parameter_fails() {
    let err = run_with_params("REQUIRED $mode\nPRINT $mode\n", &[])
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "Missing required query variable: mode");
}

#[tokio::test]
async fn optional_defaults_to_empty_string() {
    let source = "REQUIRED $mode\nOPTIONAL $missing\nPRINT \"mode=$mode missing=$missing\"\n";
    let result = run_with_params(source, &[("mode", serde_json::json!("night"))])
        .await
        .unwrap();
    assert_eq!(result.output, vec!["mode=night missing=".to_string()]);
}

#[tokio::test]
async fn required_validator_enforces_truthiness() {
    let source = "REQUIRED $level IF ($level > 0)\nPRINT $level\n";
    let ok = run_with_params(source, &[("level", serde_json::json!(5))])
        .await
        .unwrap();
    assert_eq!(ok.output, vec!["5"]);
    let err = run_with_params(source, &[("level", serde_json::json!(0))])
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "Validation failed for level");
}

#[tokio::test]
async fn optional_validator_only_applies_when_present() {
    let source = "OPTIONAL $level = 1 IF ($level > 0)\nPRINT $level\n";
    let ok = run_with_params(source, &[]).await.unwrap();
    assert_eq!(ok.output, vec!["1"]);
    let err = run_with_params(source, &[("level", serde_json::json!(-2))])
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "Validation failed for level");
}

// ========================================================================
// Containment Scenario
// ========================================================================

#[tokio::test]
async fn object_containment_prints_booleans() {
    let source = concat!(
        "SET $payload = {\"mode\":\"auto\",\"target\":22}\n",
        "PRINT \"mode\" IN $payload\n",
        "PRINT \"missing\" IN $payload\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["true", "false"]);
}

// ========================================================================
// Host Interaction
// ========================================================================

#[tokio::test]
async fn dry_run_get_yields_null_and_one_line() {
    let source = "GET light.kitchen INTO $state\nPRINT $state = NULL\n";
    let result = run(source).await.unwrap();
    assert_eq!(
        result.output,
        vec![
            "[Dry Run] GET light.kitchen INTO $state".to_string(),
            "true".to_string()
        ]
    );
    assert_eq!(result.variables.get("state"), Some(&Value::Null));
}

#[tokio::test]
async fn dry_run_set_records_intent() {
    let source = "SET light.kitchen = \"on\"\n";
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["[Dry Run] SET light.kitchen = on"]);
}

#[tokio::test]
async fn live_get_reads_host_state() {
    let mut host = TestHost::default();
    host.states
        .insert("sensor.temp".to_string(), Value::from("21.5"));
    let result = Interpreter::new(&host, InterpreterOptions::default())
        .execute("GET sensor.temp INTO $t\nPRINT $t\n")
        .await
        .unwrap();
    assert_eq!(result.output, vec!["21.5"]);
}

#[tokio::test]
async fn call_failure_is_wrapped_with_statement_name() {
    let host = TestHost {
        fail_call: Some("service exploded".to_string()),
        ..TestHost::default()
    };
    let err = Interpreter::new(&host, InterpreterOptions::default())
        .execute("CALL light.turn_on(\"light.x\")\n")
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "CALL failed: service exploded");
    assert_eq!(err.error.line, Some(1));
}

// ========================================================================
// Functions
// ========================================================================

#[tokio::test]
async fn functions_bind_parameters_and_return() {
    let source = concat!(
        "FUNCTION double($n)\n",
        "  RETURN $n * 2\n",
        "END_FUNCTION\n",
        "CALL double(21)\n",
        "PRINT $RETURN\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["42"]);
}

#[tokio::test]
async fn function_locals_do_not_leak() {
    let source = concat!(
        "SET $x = 1\n",
        "FUNCTION shadow($x)\n",
        "  SET $inner = $x + 1\n",
        "END_FUNCTION\n",
        "CALL shadow(10)\n",
        "PRINT $x\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["1"]);
    assert!(result.variables.get("inner").is_none());
}

#[tokio::test]
async fn function_arity_is_checked() {
    let source = concat!(
        "FUNCTION pair($a, $b)\n",
        "  RETURN $a\n",
        "END_FUNCTION\n",
        "CALL pair(1)\n",
    );
    let err = run(source).await.unwrap_err();
    assert!(err.error.message.contains("expects 2 arguments, got 1"));
}

// ========================================================================
// Imports
// ========================================================================

#[tokio::test]
async fn import_executes_module_once() {
    let host = TestHost::with_import("lib", "FUNCTION announce()\n  PRINT \"ready\"\nEND_FUNCTION\nPRINT \"loaded\"\n");
    let source = "IMPORT \"lib\"\nIMPORT \"lib\"\nCALL announce()\n";
    let result = Interpreter::new(&host, InterpreterOptions::default())
        .execute(source)
        .await
        .unwrap();
    assert_eq!(result.output, vec!["loaded", "ready"]);
    assert_eq!(host.import_hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_import_reports_host_message() {
    let err = run("IMPORT \"nope\"\n").await.unwrap_err();
    assert_eq!(
        err.error.message,
        "Failed to import 'nope': Script 'nope' not found"
    );
}

// ========================================================================
// Labels and Jumps
// ========================================================================

#[tokio::test]
async fn goto_jumps_forward() {
    let source = concat!(
        "PRINT \"a\"\n",
        "GOTO skip\n",
        "PRINT \"b\"\n",
        "LABEL skip\n",
        "PRINT \"c\"\n",
    );
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["a", "c"]);
}

#[tokio::test]
async fn goto_unknown_label_fails_at_runtime() {
    let err = run("GOTO nowhere\n").await.unwrap_err();
    assert_eq!(err.error.message, "GOTO to unknown label: nowhere");
}

#[tokio::test]
async fn goto_cannot_enter_function_bodies() {
    let source = concat!(
        "FUNCTION f()\n",
        "  LABEL inside\n",
        "  RETURN\n",
        "END_FUNCTION\n",
        "GOTO inside\n",
    );
    let err = run(source).await.unwrap_err();
    assert!(err.error.message.contains("function boundaries"));
}

// ========================================================================
// Regex Testing
// ========================================================================

#[tokio::test]
async fn test_statement_sets_default_variable() {
    let source = "TEST /^on$/ \"on\"\nPRINT $TEST\n";
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["true"]);
}

#[tokio::test]
async fn test_statement_accepts_either_operand_order() {
    let source = "SET $state = \"ON\"\nTEST $state /^on$/i INTO $matched\nPRINT $matched\n";
    let result = run(source).await.unwrap();
    assert_eq!(result.output, vec!["true"]);
}

#[tokio::test]
async fn invalid_test_regex_fails_precisely() {
    let err = run("TEST /([)/ \"x\"\n").await.unwrap_err();
    assert!(err.error.message.contains("Invalid regex in TEST"));
}

// ========================================================================
// Halting
// ========================================================================

#[tokio::test]
async fn break_with_error_code_fails_the_run() {
    let err = run("BREAK 404 \"not here\"\n").await.unwrap_err();
    assert_eq!(err.error.message, "not here");
    assert_eq!(err.error.status, Some(404));
}

#[tokio::test]
async fn break_with_success_code_halts_cleanly() {
    let result = run("PRINT \"before\"\nBREAK 200 \"done\"\nPRINT \"after\"\n")
        .await
        .unwrap();
    assert_eq!(result.output, vec!["before"]);
    let halt = result.halt.unwrap();
    assert_eq!(halt.code, 200);
    assert_eq!(halt.message, "done");
}

// ========================================================================
// Syntax Failures
// ========================================================================

#[tokio::test]
async fn invalid_keyword_is_rejected_with_line() {
    let err = run("PRINT 1\nFROBNICATE $x\n").await.unwrap_err();
    assert_eq!(err.error.message, "Invalid keyword: FROBNICATE");
    assert_eq!(err.error.line, Some(2));
}

#[tokio::test]
async fn unterminated_block_reports_opener_line() {
    let err = run("SET $x = 1\nIF $x > 0\nPRINT $x\n").await.unwrap_err();
    assert_eq!(err.error.message, "Missing END_IF");
    assert_eq!(err.error.line, Some(2));
}

// ========================================================================
// Partial Run State
// ========================================================================

#[tokio::test]
async fn failures_keep_partial_output_and_variables() {
    let source = "SET $x = 1\nPRINT \"step one\"\nGOTO nowhere\n";
    let err = run(source).await.unwrap_err();
    assert_eq!(err.error.message, "GOTO to unknown label: nowhere");
    assert_eq!(err.output, vec!["step one".to_string()]);
    assert_eq!(err.variables.get("x"), Some(&Value::Number(1.0)));
}

#[tokio::test]
async fn host_failures_keep_prior_dry_run_lines() {
    let host = TestHost {
        fail_call: Some("service exploded".to_string()),
        ..TestHost::default()
    };
    let source = "GET sensor.temp INTO $t\nCALL light.turn_on(\"light.x\")\n";
    let err = Interpreter::new(&host, InterpreterOptions::default())
        .execute(source)
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "CALL failed: service exploded");
    assert_eq!(err.output, vec!["[Dry Run] GET sensor.temp INTO $t".to_string()]);
    assert_eq!(err.variables.get("t"), Some(&Value::Null));
}
