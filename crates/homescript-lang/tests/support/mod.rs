// homescript-lang/tests/support/mod.rs
// ============================================================================
// Test Support: Recording host binding for interpreter tests.
// ============================================================================

//! ## Overview
//! An in-memory [`HostBindings`] implementation that records every callback
//! invocation and replays scripted debugger decisions.

#![allow(dead_code, reason = "Shared across multiple integration test crates.")]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use homescript_lang::CallOutcome;
use homescript_lang::DebugAction;
use homescript_lang::GetOutcome;
use homescript_lang::HostBindings;
use homescript_lang::HostError;
use homescript_lang::Scope;
use homescript_lang::SetOutcome;
use homescript_lang::TraceEvent;
use homescript_lang::Value;

/// Recording host with configurable behavior.
#[derive(Default)]
pub struct TestHost {
    /// Module name to source text for `IMPORT`.
    pub imports: HashMap<String, String>,
    /// Entity states served to `GET`; absent entities are dry-run.
    pub states: HashMap<String, Value>,
    /// When true, `CALL`/`SET` behave as live and succeed.
    pub live: bool,
    /// When set, `CALL` fails with this message.
    pub fail_call: Option<String>,
    /// Recorded service calls.
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
    /// Recorded state writes.
    pub sets: Mutex<Vec<(String, Value)>>,
    /// Recorded import resolutions.
    pub import_hits: Mutex<Vec<String>>,
    /// Recorded trace events.
    pub traces: Mutex<Vec<TraceEvent>>,
    /// Scripted debugger replies, consumed front-first.
    pub debug_replies: Mutex<VecDeque<DebugAction>>,
    /// Recorded breakpoint pauses.
    pub pauses: Mutex<Vec<(u32, Scope)>>,
}

impl TestHost {
    /// Builds a host with one importable module.
    pub fn with_import(name: &str, source: &str) -> Self {
        let mut host = Self::default();
        host.imports.insert(name.to_string(), source.to_string());
        host
    }
}

#[async_trait]
impl HostBindings for TestHost {
    async fn call_service(
        &self,
        service: &str,
        args: Vec<Value>,
    ) -> Result<CallOutcome, HostError> {
        if let Some(message) = &self.fail_call {
            return Err(HostError::new(message.clone()));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((service.to_string(), args));
        }
        if self.live {
            Ok(CallOutcome::Live(Value::Null))
        } else {
            Ok(CallOutcome::DryRun)
        }
    }

    async fn get_state(&self, entity_id: &str) -> Result<GetOutcome, HostError> {
        match self.states.get(entity_id) {
            Some(value) => Ok(GetOutcome::Live(value.clone())),
            None => Ok(GetOutcome::DryRun),
        }
    }

    async fn set_state(&self, entity_id: &str, value: Value) -> Result<SetOutcome, HostError> {
        if let Ok(mut sets) = self.sets.lock() {
            sets.push((entity_id.to_string(), value));
        }
        if self.live {
            Ok(SetOutcome::Applied)
        } else {
            Ok(SetOutcome::DryRun)
        }
    }

    async fn import(&self, name: &str) -> Result<String, HostError> {
        if let Ok(mut hits) = self.import_hits.lock() {
            hits.push(name.to_string());
        }
        self.imports
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::new(format!("Script '{name}' not found")))
    }

    fn trace(&self, event: TraceEvent) {
        if let Ok(mut traces) = self.traces.lock() {
            traces.push(event);
        }
    }

    async fn on_breakpoint(&self, line: u32, scope: Scope) -> DebugAction {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push((line, scope));
        }
        self.debug_replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or(DebugAction::Continue)
    }
}
