// homescript-core/src/host.rs
// ============================================================================
// Module: Run Session Host
// Description: Per-run HostBindings implementation for live/mock/dry-run.
// Purpose: Adapt interpreter side effects to HA I/O and record every attempt.
// Dependencies: crate::{debug, ha, report, script, trace}, homescript-lang
// ============================================================================

//! ## Overview
//! One [`RunSession`] exists per run and owns that run's trace exclusively.
//! Every live or mock attempt records exactly one [`crate::HaStateEvent`]
//! plus one `ha`-sourced execution event with timing; dry-run interactions
//! record nothing here because the interpreter turns them into output lines.
//! Retries are never performed at this layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use homescript_lang::CallOutcome;
use homescript_lang::DebugAction;
use homescript_lang::GetOutcome;
use homescript_lang::HostBindings;
use homescript_lang::HostError;
use homescript_lang::Scope;
use homescript_lang::SetOutcome;
use homescript_lang::TraceEvent;
use homescript_lang::TraceLevel;
use homescript_lang::Value;

use crate::debug::DebugController;
use crate::ha::HomeAssistantClient;
use crate::report::EventLevel;
use crate::report::EventSource;
use crate::report::HaAction;
use crate::report::HaStatus;
use crate::script::ScriptStore;
use crate::trace::RunTrace;

// ============================================================================
// SECTION: Target
// ============================================================================

/// Where interpreter side effects land.
#[derive(Clone)]
pub enum HaTarget {
    /// Live Home Assistant endpoint.
    Live(Arc<HomeAssistantClient>),
    /// Mock responses without network I/O.
    Mock,
    /// No host bound: side effects become dry-run output lines.
    DryRun,
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Per-run host binding.
pub struct RunSession {
    /// Side-effect target.
    target: HaTarget,
    /// Script table for `IMPORT` resolution.
    scripts: Option<Arc<dyn ScriptStore>>,
    /// This run's exclusive trace.
    trace: Mutex<RunTrace>,
    /// Debugger decision source, when debugging.
    debug: Option<Arc<dyn DebugController>>,
}

impl RunSession {
    /// Builds a session.
    #[must_use]
    pub fn new(
        target: HaTarget,
        scripts: Option<Arc<dyn ScriptStore>>,
        debug: Option<Arc<dyn DebugController>>,
    ) -> Self {
        Self {
            target,
            scripts,
            trace: Mutex::new(RunTrace::new()),
            debug,
        }
    }

    /// Consumes the session and returns the collected trace.
    #[must_use]
    pub fn into_trace(self) -> RunTrace {
        self.trace.into_inner().unwrap_or_default()
    }

    /// Appends a backend-sourced event to the trace.
    pub fn push_backend_event(&self, level: EventLevel, message: &str, line: Option<u32>) {
        if let Ok(mut trace) = self.trace.lock() {
            trace.push_event(EventSource::Backend, level, message, line, None);
        }
    }

    /// Records one HA interaction with its paired event.
    #[allow(clippy::too_many_arguments, reason = "Flat record constructor.")]
    fn record(
        &self,
        action: HaAction,
        status: HaStatus,
        entity_id: Option<String>,
        service: Option<String>,
        value: Option<serde_json::Value>,
        payload: Option<serde_json::Value>,
        error: Option<String>,
        started: Instant,
    ) {
        if let Ok(mut trace) = self.trace.lock() {
            trace.record_ha(
                action,
                status,
                entity_id,
                service,
                value,
                payload,
                error,
                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            );
        }
    }
}

/// Maps interpreter trace levels onto report levels.
const fn event_level(level: TraceLevel) -> EventLevel {
    match level {
        TraceLevel::Info => EventLevel::Info,
        TraceLevel::Success => EventLevel::Success,
        TraceLevel::Warning => EventLevel::Warning,
        TraceLevel::Error => EventLevel::Error,
    }
}

/// Splits `domain.service` into its parts.
fn split_service(service: &str) -> Result<(&str, &str), HostError> {
    service
        .split_once('.')
        .filter(|(domain, name)| !domain.is_empty() && !name.is_empty())
        .ok_or_else(|| HostError::new(format!("invalid service name '{service}'")))
}

/// Translates `CALL` arguments into a service payload.
///
/// A string first argument becomes `{entity_id}`; an object first argument
/// is forwarded unchanged; no arguments yield an empty payload.
pub(crate) fn call_payload(args: &[Value]) -> (serde_json::Value, Option<String>) {
    match args.first() {
        Some(Value::String(entity)) => (
            serde_json::json!({ "entity_id": entity }),
            Some(entity.clone()),
        ),
        Some(Value::Object(_)) => (args[0].to_json(), None),
        Some(other) => (serde_json::json!({ "value": other.to_json() }), None),
        None => (serde_json::json!({}), None),
    }
}

// ============================================================================
// SECTION: HostBindings
// ============================================================================

#[async_trait]
impl HostBindings for RunSession {
    async fn call_service(
        &self,
        service: &str,
        args: Vec<Value>,
    ) -> Result<CallOutcome, HostError> {
        match &self.target {
            HaTarget::Live(client) => {
                let (domain, name) = split_service(service)?;
                let (payload, entity_id) = call_payload(&args);
                let started = Instant::now();
                match client.call_service(domain, name, &payload).await {
                    Ok(response) => {
                        self.record(
                            HaAction::Call,
                            HaStatus::Success,
                            entity_id,
                            Some(service.to_string()),
                            None,
                            Some(payload),
                            None,
                            started,
                        );
                        Ok(CallOutcome::Live(Value::from_json(&response)))
                    }
                    Err(err) => {
                        self.record(
                            HaAction::Call,
                            HaStatus::Fail,
                            entity_id,
                            Some(service.to_string()),
                            None,
                            Some(payload),
                            Some(err.to_string()),
                            started,
                        );
                        Err(HostError::new(err.to_string()))
                    }
                }
            }
            HaTarget::Mock => {
                let (payload, entity_id) = call_payload(&args);
                self.record(
                    HaAction::Call,
                    HaStatus::Success,
                    entity_id,
                    Some(service.to_string()),
                    None,
                    Some(payload),
                    None,
                    Instant::now(),
                );
                Ok(CallOutcome::Live(Value::from_json(&serde_json::json!({
                    "success": true,
                    "simulated": true,
                }))))
            }
            HaTarget::DryRun => Ok(CallOutcome::DryRun),
        }
    }

    async fn get_state(&self, entity_id: &str) -> Result<GetOutcome, HostError> {
        match &self.target {
            HaTarget::Live(client) => {
                let started = Instant::now();
                match client.get_state(entity_id).await {
                    Ok(value) => {
                        self.record(
                            HaAction::Get,
                            HaStatus::Success,
                            Some(entity_id.to_string()),
                            None,
                            Some(value.to_json()),
                            None,
                            None,
                            started,
                        );
                        Ok(GetOutcome::Live(value))
                    }
                    Err(err) => {
                        self.record(
                            HaAction::Get,
                            HaStatus::Fail,
                            Some(entity_id.to_string()),
                            None,
                            None,
                            None,
                            Some(err.to_string()),
                            started,
                        );
                        Err(HostError::new(err.to_string()))
                    }
                }
            }
            HaTarget::Mock => {
                self.record(
                    HaAction::Get,
                    HaStatus::Success,
                    Some(entity_id.to_string()),
                    None,
                    Some(serde_json::json!("mock_state")),
                    None,
                    None,
                    Instant::now(),
                );
                Ok(GetOutcome::Live(Value::from("mock_state")))
            }
            HaTarget::DryRun => Ok(GetOutcome::DryRun),
        }
    }

    async fn set_state(&self, entity_id: &str, value: Value) -> Result<SetOutcome, HostError> {
        match &self.target {
            HaTarget::Live(client) => {
                let started = Instant::now();
                match client.set_state(entity_id, &value).await {
                    Ok(_route) => {
                        self.record(
                            HaAction::Set,
                            HaStatus::Success,
                            Some(entity_id.to_string()),
                            None,
                            Some(value.to_json()),
                            None,
                            None,
                            started,
                        );
                        Ok(SetOutcome::Applied)
                    }
                    Err(err) => {
                        self.record(
                            HaAction::Set,
                            HaStatus::Fail,
                            Some(entity_id.to_string()),
                            None,
                            Some(value.to_json()),
                            None,
                            Some(err.to_string()),
                            started,
                        );
                        Err(HostError::new(err.to_string()))
                    }
                }
            }
            HaTarget::Mock => {
                self.record(
                    HaAction::Set,
                    HaStatus::Success,
                    Some(entity_id.to_string()),
                    None,
                    Some(value.to_json()),
                    None,
                    None,
                    Instant::now(),
                );
                Ok(SetOutcome::Applied)
            }
            HaTarget::DryRun => Ok(SetOutcome::DryRun),
        }
    }

    async fn import(&self, name: &str) -> Result<String, HostError> {
        let Some(store) = &self.scripts else {
            return Err(HostError::new(format!("Script '{name}' not found")));
        };
        match store.get_by_endpoint(name) {
            Ok(Some(record)) => Ok(record.code),
            Ok(None) => Err(HostError::new(format!("Script '{name}' not found"))),
            Err(err) => Err(HostError::new(err.to_string())),
        }
    }

    fn trace(&self, event: TraceEvent) {
        if let Ok(mut trace) = self.trace.lock() {
            trace.push_event(
                EventSource::Engine,
                event_level(event.level),
                event.message,
                event.line,
                None,
            );
        }
    }

    async fn on_breakpoint(&self, line: u32, scope: Scope) -> DebugAction {
        match &self.debug {
            Some(controller) => controller.decide(line, scope).await,
            None => DebugAction::Continue,
        }
    }
}
