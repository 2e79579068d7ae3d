// homescript-lang/tests/debugger.rs
// ============================================================================
// Test Module: Debugger Protocol
// Coverage: Breakpoints, stepping, stop semantics, scope snapshots.
// ============================================================================

//! ## Overview
//! Integration tests for the breakpoint handshake.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

mod support;

use std::collections::VecDeque;

use homescript_lang::DebugAction;
use homescript_lang::DebugStepMode;
use homescript_lang::Interpreter;
use homescript_lang::InterpreterOptions;
use homescript_lang::Value;
use support::TestHost;

#[tokio::test]
async fn stop_at_breakpoint_terminates_the_run() {
    let host = TestHost {
        debug_replies: std::sync::Mutex::new(VecDeque::from([DebugAction::Stop])),
        ..TestHost::default()
    };
    let options = InterpreterOptions {
        breakpoints: vec![2],
        ..InterpreterOptions::default()
    };
    let err = Interpreter::new(&host, options)
        .execute("SET $x = 1\nPRINT $x\n")
        .await
        .unwrap_err();
    assert_eq!(err.error.message, "Debugger stopped");
    assert_eq!(err.error.line, Some(2));
    // The assignment before the pause survives on the failure payload.
    assert_eq!(err.variables.get("x"), Some(&Value::Number(1.0)));

    let pauses = host.pauses.lock().unwrap();
    assert_eq!(pauses.len(), 1);
    assert_eq!(pauses[0].0, 2);
    // The snapshot reflects state before the paused statement runs.
    assert_eq!(pauses[0].1.get("x"), Some(&Value::Number(1.0)));
}

#[tokio::test]
async fn continue_resumes_until_next_breakpoint() {
    let host = TestHost::default();
    let options = InterpreterOptions {
        breakpoints: vec![1, 3],
        ..InterpreterOptions::default()
    };
    let result = Interpreter::new(&host, options)
        .execute("PRINT \"a\"\nPRINT \"b\"\nPRINT \"c\"\n")
        .await
        .unwrap();
    assert_eq!(result.output, vec!["a", "b", "c"]);
    let pauses = host.pauses.lock().unwrap();
    let lines: Vec<u32> = pauses.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![1, 3]);
}

#[tokio::test]
async fn step_pauses_on_every_following_statement() {
    let host = TestHost {
        debug_replies: std::sync::Mutex::new(VecDeque::from([
            DebugAction::Step,
            DebugAction::Step,
            DebugAction::Continue,
        ])),
        ..TestHost::default()
    };
    let options = InterpreterOptions {
        breakpoints: vec![1],
        ..InterpreterOptions::default()
    };
    let result = Interpreter::new(&host, options)
        .execute("PRINT \"a\"\nPRINT \"b\"\nPRINT \"c\"\nPRINT \"d\"\n")
        .await
        .unwrap();
    assert_eq!(result.output.len(), 4);
    let pauses = host.pauses.lock().unwrap();
    let lines: Vec<u32> = pauses.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[tokio::test]
async fn manual_mode_pauses_before_the_first_statement() {
    let host = TestHost {
        debug_replies: std::sync::Mutex::new(VecDeque::from([DebugAction::Continue])),
        ..TestHost::default()
    };
    let options = InterpreterOptions {
        debug_step_mode: DebugStepMode::Manual,
        ..InterpreterOptions::default()
    };
    let result = Interpreter::new(&host, options)
        .execute("PRINT \"a\"\nPRINT \"b\"\n")
        .await
        .unwrap();
    assert_eq!(result.output, vec!["a", "b"]);
    let pauses = host.pauses.lock().unwrap();
    assert_eq!(pauses.len(), 1);
    assert_eq!(pauses[0].0, 1);
}

#[tokio::test]
async fn no_breakpoints_means_no_pauses() {
    let host = TestHost::default();
    let result = Interpreter::new(&host, InterpreterOptions::default())
        .execute("PRINT \"a\"\n")
        .await
        .unwrap();
    assert_eq!(result.output, vec!["a"]);
    assert!(host.pauses.lock().unwrap().is_empty());
}
