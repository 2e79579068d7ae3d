// homescript-core/src/debug.rs
// ============================================================================
// Module: Debug Controllers
// Description: Decision sources for the breakpoint handshake.
// Purpose: Auto-paced stepping and channel-backed manual stepping.
// Dependencies: homescript-lang, tokio::sync
// ============================================================================

//! ## Overview
//! The interpreter hands `(line, scope snapshot)` to a controller and awaits
//! one of `CONTINUE`/`STEP`/`STOP`. [`AutoStepController`] resumes on its
//! own after a configurable line delay unless a stop was requested;
//! [`ChannelController`] forwards each pause over a channel so an operator
//! session can drive it interactively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use homescript_lang::DebugAction;
use homescript_lang::Scope;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configurable line delay in milliseconds.
pub const MAX_LINE_DELAY_MS: u64 = 5_000;

// ============================================================================
// SECTION: Controller Trait
// ============================================================================

/// Source of debugger decisions.
#[async_trait]
pub trait DebugController: Send + Sync {
    /// Decides what to do at a paused line.
    async fn decide(&self, line: u32, scope: Scope) -> DebugAction;
}

// ============================================================================
// SECTION: Auto Stepping
// ============================================================================

/// Controller for `debugStepMode=auto`: waits the line delay, then resumes
/// with `CONTINUE` unless a stop has been requested externally.
pub struct AutoStepController {
    /// Delay applied before resuming, clamped to 0–5000 ms.
    delay: Duration,
    /// External stop request flag.
    stop: Arc<AtomicBool>,
}

impl AutoStepController {
    /// Builds a controller with a clamped line delay.
    #[must_use]
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms.min(MAX_LINE_DELAY_MS)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a handle that stops the run at the next pause.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

#[async_trait]
impl DebugController for AutoStepController {
    async fn decide(&self, _line: u32, _scope: Scope) -> DebugAction {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.stop.load(Ordering::SeqCst) {
            DebugAction::Stop
        } else {
            DebugAction::Continue
        }
    }
}

// ============================================================================
// SECTION: Manual Stepping
// ============================================================================

/// One forwarded pause awaiting an operator decision.
pub struct DebugPause {
    /// Paused physical line.
    pub line: u32,
    /// Scope snapshot at the pause.
    pub scope: Scope,
    /// Reply channel for the decision.
    pub reply: oneshot::Sender<DebugAction>,
}

/// Controller for `debugStepMode=manual`: each pause is sent over a channel
/// and the run blocks until the operator replies.
pub struct ChannelController {
    /// Pause sink consumed by the operator session.
    pauses: mpsc::Sender<DebugPause>,
}

impl ChannelController {
    /// Builds a controller and the receiver the operator session reads.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DebugPause>) {
        let (pauses, receiver) = mpsc::channel(buffer.max(1));
        (Self { pauses }, receiver)
    }
}

#[async_trait]
impl DebugController for ChannelController {
    async fn decide(&self, line: u32, scope: Scope) -> DebugAction {
        let (reply, response) = oneshot::channel();
        let pause = DebugPause { line, scope, reply };
        // A closed channel means the operator session is gone; stop the run.
        if self.pauses.send(pause).await.is_err() {
            return DebugAction::Stop;
        }
        response.await.unwrap_or(DebugAction::Stop)
    }
}
