// homescript-core/tests/debug.rs
// ============================================================================
// Test Module: Debug Controllers
// Coverage: Auto-step resume/stop and channel-backed manual stepping.
// ============================================================================

//! ## Overview
//! Integration tests for the debugger decision sources.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use homescript_core::AutoStepController;
use homescript_core::ChannelController;
use homescript_core::DebugController;
use homescript_core::HaTarget;
use homescript_core::RunOptions;
use homescript_core::ScriptRunner;
use homescript_lang::DebugAction;
use homescript_lang::DebugStepMode;
use homescript_lang::Scope;

#[tokio::test]
async fn auto_controller_resumes_until_stopped() {
    let controller = AutoStepController::new(0);
    assert_eq!(
        controller.decide(1, Scope::new()).await,
        DebugAction::Continue
    );
    controller.stop_handle().store(true, Ordering::SeqCst);
    assert_eq!(controller.decide(2, Scope::new()).await, DebugAction::Stop);
}

#[tokio::test]
async fn channel_controller_forwards_pauses() {
    let (controller, mut pauses) = ChannelController::new(4);
    let decision = tokio::spawn(async move { controller.decide(7, Scope::new()).await });
    let pause = pauses.recv().await.unwrap();
    assert_eq!(pause.line, 7);
    pause.reply.send(DebugAction::Step).unwrap();
    assert_eq!(decision.await.unwrap(), DebugAction::Step);
}

#[tokio::test]
async fn channel_controller_drives_a_manual_run() {
    let (controller, mut pauses) = ChannelController::new(4);
    let runner = ScriptRunner::new(HaTarget::DryRun, None);
    let mut options = RunOptions::for_endpoint("stepper");
    options.debug_step_mode = DebugStepMode::Manual;
    options.debug = Some(Arc::new(controller));

    let operator = tokio::spawn(async move {
        let mut lines = Vec::new();
        while let Some(pause) = pauses.recv().await {
            lines.push(pause.line);
            let reply = if lines.len() < 2 {
                DebugAction::Step
            } else {
                DebugAction::Continue
            };
            let _ = pause.reply.send(reply);
        }
        lines
    });

    let report = runner.execute("PRINT 1\nPRINT 2\nPRINT 3\n", options).await;
    assert!(report.success);
    assert_eq!(report.output, vec!["1", "2", "3"]);
    let lines = operator.await.unwrap();
    assert_eq!(lines, vec![1, 2]);
}
