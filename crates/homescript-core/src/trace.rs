// homescript-core/src/trace.rs
// ============================================================================
// Module: Run Trace Collector
// Description: Per-run accumulator for events and HA interactions.
// Purpose: Assign sequential ids and keep both streams time-ordered.
// Dependencies: crate::report
// ============================================================================

//! ## Overview
//! Each run owns exactly one [`RunTrace`]; it is never shared across runs.
//! Events receive sequential ids in observation order, which together with
//! monotonic wall-clock stamps keeps the report streams append-only and
//! time-ordered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;

use crate::report::EventLevel;
use crate::report::EventSource;
use crate::report::ExecutionEvent;
use crate::report::HaAction;
use crate::report::HaStateEvent;
use crate::report::HaStatus;

// ============================================================================
// SECTION: Time
// ============================================================================

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ============================================================================
// SECTION: Trace
// ============================================================================

/// Accumulator for one run's event streams.
#[derive(Debug, Default)]
pub struct RunTrace {
    /// Collected execution events.
    events: Vec<ExecutionEvent>,
    /// Collected HA interaction records.
    ha_states: Vec<HaStateEvent>,
    /// Next event id.
    next_id: u64,
}

impl RunTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an execution event and returns its id.
    pub fn push_event(
        &mut self,
        source: EventSource,
        level: EventLevel,
        message: impl Into<String>,
        line: Option<u32>,
        details: Option<Value>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(ExecutionEvent {
            id,
            timestamp: now_ms(),
            source,
            level,
            message: message.into(),
            line,
            details,
        });
        id
    }

    /// Appends a Home Assistant interaction record.
    pub fn push_ha(&mut self, event: HaStateEvent) {
        self.ha_states.push(event);
    }

    /// Convenience: records an HA interaction plus its paired `ha` event.
    #[allow(clippy::too_many_arguments, reason = "Flat record constructor.")]
    pub fn record_ha(
        &mut self,
        action: HaAction,
        status: HaStatus,
        entity_id: Option<String>,
        service: Option<String>,
        value: Option<Value>,
        payload: Option<Value>,
        error: Option<String>,
        duration_ms: u64,
    ) {
        let verb = match action {
            HaAction::Get => "get",
            HaAction::Set => "set",
            HaAction::Call => "call",
        };
        let message = match (&service, &entity_id) {
            (Some(service), _) => format!("{verb} {service}"),
            (None, Some(entity)) => format!("{verb} {entity}"),
            (None, None) => verb.to_string(),
        };
        let level = match status {
            HaStatus::Success => EventLevel::Success,
            HaStatus::Fail => EventLevel::Error,
        };
        self.push_event(
            EventSource::Ha,
            level,
            message,
            None,
            Some(serde_json::json!({ "durationMs": duration_ms })),
        );
        self.ha_states.push(HaStateEvent {
            timestamp: now_ms(),
            action,
            status,
            entity_id,
            service,
            value,
            payload,
            error,
        });
    }

    /// Consumes the trace, returning both streams.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ExecutionEvent>, Vec<HaStateEvent>) {
        (self.events, self.ha_states)
    }

    /// Number of collected events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of collected HA records.
    #[must_use]
    pub fn ha_count(&self) -> usize {
        self.ha_states.len()
    }
}
