// homescript-trigger/src/engine.rs
// ============================================================================
// Module: Trigger Engine
// Description: Long-lived automation-bus subscriber and dispatcher.
// Purpose: Authenticate, subscribe to state_changed, evaluate, dispatch.
// Dependencies: crate::{matcher, rules}, homescript-core, tokio-tungstenite
// ============================================================================

//! ## Overview
//! The engine owns one duplex websocket connection to the automation bus.
//! On unexpected close it reconnects after a fixed 5 s backoff. Events are
//! processed serially; multiple triggered scripts for one event run in
//! sequence, and script failures are logged through the sink but never
//! abort the subscriber loop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use futures_util::StreamExt;
use homescript_core::RunOptions;
use homescript_core::ScriptRunner;
use homescript_core::ScriptStore;
use homescript_core::now_ms;
use homescript_lang::Value;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::matcher::GroupOutcome;
use crate::matcher::StateChange;
use crate::matcher::evaluate_rule_group;
use crate::rules::TriggerConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed reconnect backoff after an unexpected close.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Sink
// ============================================================================

/// One engine observability event.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerEngineEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Event kind label.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Script endpoint when the event concerns one script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl TriggerEngineEvent {
    /// Builds an event.
    #[must_use]
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            kind,
            message: message.into(),
            endpoint: None,
        }
    }

    /// Returns a copy tagged with a script endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Destination for engine observability events.
pub trait TriggerSink: Send + Sync {
    /// Receives one event.
    fn event(&self, event: TriggerEngineEvent);
}

/// Sink that drops all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTriggerSink;

impl TriggerSink for NoopTriggerSink {
    fn event(&self, _event: TriggerEngineEvent) {}
}

/// Sink that writes JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTriggerSink;

impl TriggerSink for StderrTriggerSink {
    fn event(&self, event: TriggerEngineEvent) {
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Connection-level engine failure; triggers a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The websocket could not be established.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The peer rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The stream failed mid-conversation.
    #[error("stream failed: {0}")]
    Stream(String),
}

// ============================================================================
// SECTION: Bus Messages
// ============================================================================

/// Parsed inbound bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// Peer requests authentication.
    AuthRequired,
    /// Authentication accepted.
    AuthOk,
    /// Authentication rejected.
    AuthInvalid,
    /// A delivered `state_changed` event.
    Event(StateChange),
    /// Anything else (result acks, pongs).
    Other,
}

/// Parses one inbound text frame.
#[must_use]
pub fn parse_bus_message(text: &str) -> BusMessage {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
        return BusMessage::Other;
    };
    match json.get("type").and_then(serde_json::Value::as_str) {
        Some("auth_required") => BusMessage::AuthRequired,
        Some("auth_ok") => BusMessage::AuthOk,
        Some("auth_invalid") => BusMessage::AuthInvalid,
        Some("event") => {
            let data = &json["event"]["data"];
            let Some(entity_id) = data.get("entity_id").and_then(serde_json::Value::as_str)
            else {
                return BusMessage::Other;
            };
            let state_of = |which: &str| -> Option<String> {
                data.get(which)
                    .and_then(|state| state.get("state"))
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            };
            BusMessage::Event(StateChange {
                entity_id: entity_id.to_string(),
                old: state_of("old_state"),
                new: state_of("new_state"),
            })
        }
        _ => BusMessage::Other,
    }
}

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Builds the `event` payload bound into a triggered script's scope.
#[must_use]
pub fn build_event_payload(
    config: &TriggerConfig,
    outcome: &GroupOutcome,
    change: &StateChange,
    timestamp_ms: u64,
) -> serde_json::Value {
    serde_json::json!({
        "type": "rule_group",
        "logic": config.logic,
        "expression": config.rule_expression,
        "entity_id": change.entity_id,
        "name": outcome.name,
        "value": outcome.value,
        "matches": outcome.matches,
        "rule_vars": outcome.rule_vars,
        "expression_error": outcome.expression_error,
        "old": change.old,
        "current": change.new,
        "timestamp": timestamp_ms,
    })
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Connection settings for the engine.
#[derive(Debug, Clone)]
pub struct TriggerEngineConfig {
    /// Home Assistant base URL (http/https).
    pub ha_url: String,
    /// Long-lived access token.
    pub token: String,
    /// Backoff between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl TriggerEngineConfig {
    /// Builds a config with the default backoff.
    #[must_use]
    pub fn new(ha_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            ha_url: ha_url.into(),
            token: token.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Derives the websocket endpoint from the base URL.
    #[must_use]
    pub fn websocket_url(&self) -> String {
        let base = self.ha_url.trim_end_matches('/');
        let socket_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{socket_base}/api/websocket")
    }
}

/// The event-trigger engine.
pub struct TriggerEngine {
    /// Connection settings.
    config: TriggerEngineConfig,
    /// Script table, read on each event.
    scripts: Arc<dyn ScriptStore>,
    /// Execution host shared with the HTTP surface.
    runner: Arc<ScriptRunner>,
    /// Observability sink.
    sink: Arc<dyn TriggerSink>,
}

impl TriggerEngine {
    /// Builds an engine.
    #[must_use]
    pub fn new(
        config: TriggerEngineConfig,
        scripts: Arc<dyn ScriptStore>,
        runner: Arc<ScriptRunner>,
        sink: Arc<dyn TriggerSink>,
    ) -> Self {
        Self {
            config,
            scripts,
            runner,
            sink,
        }
    }

    /// Runs the subscriber loop until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let finished = tokio::select! {
                result = self.connect_and_stream() => Some(result),
                _ = shutdown.changed() => None,
            };
            match finished {
                None => break,
                Some(Ok(())) => {
                    self.sink
                        .event(TriggerEngineEvent::new("disconnected", "connection closed"));
                }
                Some(Err(err)) => {
                    self.sink
                        .event(TriggerEngineEvent::new("connection_error", err.to_string()));
                }
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        self.sink
            .event(TriggerEngineEvent::new("stopped", "trigger engine stopped"));
    }

    /// One connection lifetime: handshake, subscribe, stream events.
    async fn connect_and_stream(&self) -> Result<(), EngineError> {
        let url = self.config.websocket_url();
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|err| EngineError::Connect(err.to_string()))?;
        let (mut write, mut read) = stream.split();
        let mut next_id: u64 = 1;

        while let Some(frame) = read.next().await {
            let frame = frame.map_err(|err| EngineError::Stream(err.to_string()))?;
            let Message::Text(text) = frame else {
                continue;
            };
            match parse_bus_message(&text) {
                BusMessage::AuthRequired => {
                    let reply = serde_json::json!({
                        "type": "auth",
                        "access_token": self.config.token,
                    });
                    write
                        .send(Message::Text(reply.to_string()))
                        .await
                        .map_err(|err| EngineError::Stream(err.to_string()))?;
                }
                BusMessage::AuthOk => {
                    let subscribe = serde_json::json!({
                        "id": next_id,
                        "type": "subscribe_events",
                        "event_type": "state_changed",
                    });
                    next_id += 1;
                    write
                        .send(Message::Text(subscribe.to_string()))
                        .await
                        .map_err(|err| EngineError::Stream(err.to_string()))?;
                    self.sink.event(TriggerEngineEvent::new(
                        "subscribed",
                        "listening for state_changed events",
                    ));
                }
                BusMessage::AuthInvalid => {
                    return Err(EngineError::Auth("access token rejected".to_string()));
                }
                BusMessage::Event(change) => self.handle_state_change(&change).await,
                BusMessage::Other => {}
            }
        }
        Ok(())
    }

    /// Evaluates every configured script against one state change.
    pub async fn handle_state_change(&self, change: &StateChange) {
        let scripts = match self.scripts.list() {
            Ok(scripts) => scripts,
            Err(err) => {
                self.sink
                    .event(TriggerEngineEvent::new("store_error", err.to_string()));
                return;
            }
        };

        for script in scripts {
            let Some(raw) = script.trigger_config.as_deref().filter(|raw| !raw.trim().is_empty())
            else {
                continue;
            };
            let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) else {
                self.sink.event(
                    TriggerEngineEvent::new("config_error", "trigger config is not valid JSON")
                        .with_endpoint(&script.endpoint),
                );
                continue;
            };
            let config = TriggerConfig::from_value(&json);
            if config.is_empty() {
                continue;
            }

            let outcome = evaluate_rule_group(&config, change);
            if let Some(error) = &outcome.expression_error {
                self.sink.event(
                    TriggerEngineEvent::new("rule_expression_error", error.clone())
                        .with_endpoint(&script.endpoint),
                );
            }
            if !outcome.fired {
                continue;
            }

            let payload = build_event_payload(&config, &outcome, change, now_ms());
            let options = RunOptions::for_endpoint(&script.endpoint)
                .with_event(Value::from_json(&payload));
            let report = self.runner.execute(&script.code, options).await;
            if report.success {
                self.sink.event(
                    TriggerEngineEvent::new("script_dispatched", format!("{} fired", change.entity_id))
                        .with_endpoint(&script.endpoint),
                );
            } else {
                let message = report
                    .error
                    .map_or_else(|| "run failed".to_string(), |error| error.message);
                self.sink.event(
                    TriggerEngineEvent::new("script_failed", message)
                        .with_endpoint(&script.endpoint),
                );
            }
        }
    }
}
