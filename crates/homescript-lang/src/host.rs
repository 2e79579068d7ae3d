// homescript-lang/src/host.rs
// ============================================================================
// Module: Host Capability Interface
// Description: The contract between the interpreter and the outside world.
// Purpose: Route CALL/GET/SET/IMPORT, tracing, and the debugger handshake.
// Dependencies: async-trait, crate::value
// ============================================================================

//! ## Overview
//! The interpreter never performs I/O directly: every side effect goes
//! through [`HostBindings`]. Live, mock, and dry-run hosts share this
//! interface. [`DryRunHost`] is the default binding; it reports dry-run
//! outcomes so side-effecting statements record intent in the run output
//! instead of touching the network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::value::Scope;
use crate::value::Value;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of a host service invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The host performed the call and returned a response value.
    Live(Value),
    /// No host is bound; the statement records intent only.
    DryRun,
}

/// Result of a host state read.
#[derive(Debug, Clone, PartialEq)]
pub enum GetOutcome {
    /// The host read a state value.
    Live(Value),
    /// No host is bound; the target variable becomes null.
    DryRun,
}

/// Result of a host state write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The host applied the write.
    Applied,
    /// No host is bound; the statement records intent only.
    DryRun,
}

/// Reply to a debugger pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebugAction {
    /// Resume until the next breakpoint.
    Continue,
    /// Execute one statement, then pause again.
    Step,
    /// Terminate the run with `Debugger stopped`.
    Stop,
}

// ============================================================================
// SECTION: Trace Events
// ============================================================================

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Informational progress.
    Info,
    /// Successful milestone.
    Success,
    /// Recoverable anomaly.
    Warning,
    /// Failure.
    Error,
}

/// One interpreter-observed event, forwarded to the host's trace sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Physical line the event is anchored to, when meaningful.
    pub line: Option<u32>,
    /// Event severity.
    pub level: TraceLevel,
    /// Human-readable message.
    pub message: String,
}

impl TraceEvent {
    /// Builds an informational event.
    #[must_use]
    pub fn info(line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            line,
            level: TraceLevel::Info,
            message: message.into(),
        }
    }

    /// Builds a warning event.
    #[must_use]
    pub fn warning(line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            line,
            level: TraceLevel::Warning,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Host Error
// ============================================================================

/// Failure reported by a host callback.
///
/// The interpreter wraps these with the statement name, so the message
/// should describe only the host-side condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    /// Host-side failure description.
    pub message: String,
}

impl HostError {
    /// Builds a host error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Host Bindings
// ============================================================================

/// The four capability slots plus tracing and the debugger handshake.
#[async_trait]
pub trait HostBindings: Send + Sync {
    /// Dispatches `CALL domain.service(args)`.
    async fn call_service(&self, service: &str, args: Vec<Value>)
    -> Result<CallOutcome, HostError>;

    /// Reads an entity state for `GET`.
    async fn get_state(&self, entity_id: &str) -> Result<GetOutcome, HostError>;

    /// Writes an entity state for `SET entity_id = …`.
    async fn set_state(&self, entity_id: &str, value: Value) -> Result<SetOutcome, HostError>;

    /// Resolves an `IMPORT "name"` to module source text.
    async fn import(&self, name: &str) -> Result<String, HostError>;

    /// Receives interpreter trace events in observation order.
    fn trace(&self, event: TraceEvent);

    /// Debugger pause handshake: called with the paused line and a scope
    /// snapshot, returns the operator's decision.
    async fn on_breakpoint(&self, line: u32, scope: Scope) -> DebugAction;
}

// ============================================================================
// SECTION: Dry-Run Host
// ============================================================================

/// Host binding with no live backend: all side effects become dry-run
/// output lines and imports cannot resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunHost;

#[async_trait]
impl HostBindings for DryRunHost {
    async fn call_service(
        &self,
        _service: &str,
        _args: Vec<Value>,
    ) -> Result<CallOutcome, HostError> {
        Ok(CallOutcome::DryRun)
    }

    async fn get_state(&self, _entity_id: &str) -> Result<GetOutcome, HostError> {
        Ok(GetOutcome::DryRun)
    }

    async fn set_state(&self, _entity_id: &str, _value: Value) -> Result<SetOutcome, HostError> {
        Ok(SetOutcome::DryRun)
    }

    async fn import(&self, name: &str) -> Result<String, HostError> {
        Err(HostError::new(format!("Script '{name}' not found")))
    }

    fn trace(&self, _event: TraceEvent) {}

    async fn on_breakpoint(&self, _line: u32, _scope: Scope) -> DebugAction {
        DebugAction::Continue
    }
}
