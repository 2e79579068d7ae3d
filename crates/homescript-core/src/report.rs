// homescript-core/src/report.rs
// ============================================================================
// Module: Execution Report Model
// Description: The structured artifact returned by every run.
// Purpose: Define the versioned report schema and its event payloads.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every run returns a complete [`ExecutionReport`], success or failure.
//! Events and HA state events are append-only and strictly time-ordered.
//! JSON field names are camelCase; `schemaVersion` is 1 and must be bumped
//! on any breaking change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current report schema version.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Origin of an execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Emitted by the UI while replaying a report.
    Frontend,
    /// Emitted by the HTTP layer or runner.
    Backend,
    /// Emitted by the interpreter.
    Engine,
    /// Emitted by the Home Assistant adapter.
    Ha,
}

/// Severity of an execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Informational progress.
    Info,
    /// Successful milestone.
    Success,
    /// Recoverable anomaly.
    Warning,
    /// Failure.
    Error,
}

/// One run event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    /// Sequential event id within the run.
    pub id: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Origin of the event.
    pub source: EventSource,
    /// Severity.
    pub level: EventLevel,
    /// Human-readable message.
    pub message: String,
    /// Physical script line, when anchored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Structured payload, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Kind of Home Assistant interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaAction {
    /// State read.
    Get,
    /// State write.
    Set,
    /// Service invocation.
    Call,
}

/// Outcome of a Home Assistant interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaStatus {
    /// The interaction completed.
    Success,
    /// The interaction failed.
    Fail,
}

/// One Home Assistant interaction record.
///
/// Exactly one record exists per host-callback invocation; there are no
/// orphan records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HaStateEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Interaction kind.
    pub action: HaAction,
    /// Interaction outcome.
    pub status: HaStatus,
    /// Target entity, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Service name, for `call`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Read or written value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Service payload, for `call`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure description, when status is `fail`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Meta
// ============================================================================

/// Credential path that authorized the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bearer token.
    Jwt,
    /// Service-credential header pair.
    ServiceKey,
    /// Whitelist-IP debug path.
    DebugBypass,
    /// Mock deployment without credentials.
    Mock,
    /// No credential path identified.
    Unknown,
}

/// Whether a live Home Assistant endpoint is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaMode {
    /// Live endpoint configured.
    Real,
    /// Mock or dry-run deployment.
    Mock,
}

/// Run metadata stamped by the host on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// Fresh UUID per run.
    pub request_id: String,
    /// Endpoint the script is bound to.
    pub endpoint: String,
    /// Credential path that authorized the caller.
    pub auth_mode: AuthMode,
    /// Live or mock Home Assistant.
    pub ha_mode: HaMode,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// HTTP status the adapter should return.
    pub http_status: u16,
}

/// Failure description on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportError {
    /// Failure message.
    pub message: String,
    /// Offending physical line, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// The structured artifact returned by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Schema version; bump on breaking changes.
    pub schema_version: u32,
    /// True iff `error` is absent.
    pub success: bool,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// `PRINT` and dry-run output lines in order.
    pub output: Vec<String>,
    /// Final variable table as a JSON object.
    pub variables: Value,
    /// Run events, append-only and time-ordered.
    pub events: Vec<ExecutionEvent>,
    /// Home Assistant interactions, append-only and time-ordered.
    pub ha_states: Vec<HaStateEvent>,
    /// Failure description, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
    /// Run metadata.
    pub meta: ReportMeta,
}
