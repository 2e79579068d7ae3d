// homescript-core/src/runner.rs
// ============================================================================
// Module: Script Runner
// Description: The single canonical execution path for scripts.
// Purpose: Wire scope building, interpretation, tracing, and report stamping.
// Dependencies: crate::{enums, host, report, script, trace}, homescript-lang
// ============================================================================

//! ## Overview
//! Every surface (HTTP run endpoint, webhook, trigger engine, CLI) executes
//! scripts through [`ScriptRunner::execute`] so reports stay uniform: a
//! fresh request id per run, `ENUMS` in scope, merged parameters available
//! both as variables and as `REQUIRED`/`OPTIONAL` sources, and a complete
//! report on success and failure alike. Failed runs keep the output and
//! variables accumulated before the failure; a debugger stop is reported as
//! a normal completed run with a warning event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use homescript_lang::DebugStepMode;
use homescript_lang::Interpreter;
use homescript_lang::InterpreterOptions;
use homescript_lang::Scope;
use homescript_lang::Value;
use uuid::Uuid;

use crate::debug::DebugController;
use crate::enums::builtin_enums;
use crate::host::HaTarget;
use crate::host::RunSession;
use crate::report::AuthMode;
use crate::report::EventLevel;
use crate::report::ExecutionReport;
use crate::report::HaMode;
use crate::report::REPORT_SCHEMA_VERSION;
use crate::report::ReportError;
use crate::report::ReportMeta;
use crate::script::ScriptStore;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Per-run inputs.
pub struct RunOptions {
    /// Endpoint the script is bound to, recorded on the report meta.
    pub endpoint: String,
    /// Merged query/body parameters.
    pub params: BTreeMap<String, Value>,
    /// Event payload for trigger runs, bound as `$event`.
    pub event: Option<Value>,
    /// Credential path that authorized the caller.
    pub auth_mode: AuthMode,
    /// Breakpoint lines.
    pub breakpoints: Vec<u32>,
    /// Debugger pacing mode.
    pub debug_step_mode: DebugStepMode,
    /// Debugger decision source, when debugging.
    pub debug: Option<Arc<dyn DebugController>>,
}

impl RunOptions {
    /// Builds default options for an endpoint.
    #[must_use]
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
            event: None,
            auth_mode: AuthMode::Unknown,
            breakpoints: Vec::new(),
            debug_step_mode: DebugStepMode::Auto,
            debug: None,
        }
    }

    /// Returns a copy with parameters set.
    #[must_use]
    pub fn with_params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Returns a copy with the auth mode set.
    #[must_use]
    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Returns a copy with the trigger event payload bound.
    #[must_use]
    pub fn with_event(mut self, event: Value) -> Self {
        self.event = Some(event);
        self
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Executes scripts and produces execution reports.
pub struct ScriptRunner {
    /// Side-effect target shared across runs.
    target: HaTarget,
    /// Script table for `IMPORT` resolution.
    scripts: Option<Arc<dyn ScriptStore>>,
}

impl ScriptRunner {
    /// Builds a runner.
    #[must_use]
    pub fn new(target: HaTarget, scripts: Option<Arc<dyn ScriptStore>>) -> Self {
        Self { target, scripts }
    }

    /// Reports whether a live Home Assistant endpoint is configured.
    #[must_use]
    pub fn ha_mode(&self) -> HaMode {
        match self.target {
            HaTarget::Live(_) => HaMode::Real,
            HaTarget::Mock | HaTarget::DryRun => HaMode::Mock,
        }
    }

    /// Executes a script and always returns a complete report.
    pub async fn execute(&self, source: &str, options: RunOptions) -> ExecutionReport {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        let mut scope = Scope::new();
        scope.set("ENUMS", builtin_enums());
        for (name, value) in &options.params {
            scope.set(name.clone(), value.clone());
        }
        if let Some(event) = &options.event {
            scope.set("event", event.clone());
        }

        let session = RunSession::new(
            self.target.clone(),
            self.scripts.clone(),
            options.debug.clone(),
        );
        let interpreter_options = InterpreterOptions {
            scope,
            query_params: options.params.clone(),
            breakpoints: options.breakpoints.clone(),
            debug_step_mode: options.debug_step_mode,
        };

        let result = Interpreter::new(&session, interpreter_options)
            .execute(source)
            .await;

        let (success, output, variables, error, http_status) = match result {
            Ok(execution) => {
                let http_status = execution.halt.as_ref().map_or(200, |halt| halt.code);
                (
                    true,
                    execution.output,
                    execution.variables.to_json(),
                    None,
                    http_status,
                )
            }
            Err(failure) if failure.error.is_debugger_stop() => {
                session.push_backend_event(
                    EventLevel::Warning,
                    &failure.error.message,
                    failure.error.line,
                );
                (
                    true,
                    failure.output,
                    failure.variables.to_json(),
                    None,
                    200,
                )
            }
            Err(failure) => {
                session.push_backend_event(
                    EventLevel::Error,
                    &failure.error.message,
                    failure.error.line,
                );
                let http_status = failure.error.status.unwrap_or(400);
                (
                    false,
                    failure.output,
                    failure.variables.to_json(),
                    Some(ReportError {
                        message: failure.error.message,
                        line: failure.error.line,
                    }),
                    http_status,
                )
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (events, ha_states) = session.into_trace().into_parts();

        ExecutionReport {
            schema_version: REPORT_SCHEMA_VERSION,
            success,
            duration_ms,
            output,
            variables,
            events,
            ha_states,
            error,
            meta: ReportMeta {
                request_id,
                endpoint: options.endpoint,
                auth_mode: options.auth_mode,
                ha_mode: self.ha_mode(),
                duration_ms,
                http_status,
            },
        }
    }
}
