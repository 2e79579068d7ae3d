// homescript-core/src/lib.rs
// ============================================================================
// Module: HomeScript Core Root
// Description: Public API surface for the execution host.
// Purpose: Wire together script records, HA I/O, reports, and the runner.
// Dependencies: crate::{debug, enums, ha, host, report, runner, script, trace}
// ============================================================================

//! ## Overview
//! The execution host adapts interpreter side effects (`CALL`, `GET`, `SET`,
//! `IMPORT`) to live Home Assistant I/O, mock simulation, or dry-run
//! recording, and produces the structured execution report every run
//! returns. All API surfaces (HTTP, webhook, trigger engine, CLI) execute
//! scripts through [`ScriptRunner`] so reports stay uniform.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod debug;
pub mod enums;
pub mod ha;
pub mod host;
pub mod report;
pub mod runner;
pub mod script;
pub mod trace;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use debug::AutoStepController;
pub use debug::ChannelController;
pub use debug::DebugController;
pub use debug::DebugPause;
pub use enums::builtin_enums;
pub use ha::DEFAULT_TIMEOUT_MS;
pub use ha::HaConfig;
pub use ha::HaError;
pub use ha::HistoryResult;
pub use ha::HomeAssistantClient;
pub use ha::SetRoute;
pub use ha::parse_history_response;
pub use ha::set_route;
pub use host::HaTarget;
pub use host::RunSession;
pub use report::AuthMode;
pub use report::EventLevel;
pub use report::EventSource;
pub use report::ExecutionEvent;
pub use report::ExecutionReport;
pub use report::HaAction;
pub use report::HaMode;
pub use report::HaStateEvent;
pub use report::HaStatus;
pub use report::REPORT_SCHEMA_VERSION;
pub use report::ReportError;
pub use report::ReportMeta;
pub use runner::RunOptions;
pub use runner::ScriptRunner;
pub use script::DebugAccessSettings;
pub use script::DebugAccessStore;
pub use script::InMemoryStore;
pub use script::ScriptRecord;
pub use script::ScriptStore;
pub use script::ServiceAccount;
pub use script::ServiceAccountStore;
pub use script::StoreError;
pub use script::validate_endpoint;
pub use trace::RunTrace;
pub use trace::now_ms;
