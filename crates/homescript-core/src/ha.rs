// homescript-core/src/ha.rs
// ============================================================================
// Module: Home Assistant Client
// Description: Bounded REST client for the remote automation service.
// Purpose: State reads/writes, service calls, and history with deadlines.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! All outbound calls carry a per-request deadline (default 8000 ms).
//! Deadline and connection failures are normalized to a single
//! `Home Assistant request failed: <reason>` message so the interpreter and
//! report surface one stable shape. No retries happen at this layer; the
//! first failure is surfaced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use homescript_lang::Value;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default outbound deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Domains controlled with `turn_on`/`turn_off`.
const SWITCHABLE_DOMAINS: &[&str] = &[
    "light",
    "switch",
    "fan",
    "input_boolean",
    "automation",
    "script",
    "siren",
    "humidifier",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure raised by the Home Assistant client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HaError {
    /// Connection refused, host not found, or deadline elapsed.
    #[error("Home Assistant request failed: {0}")]
    Unreachable(String),
    /// The remote returned a non-success status.
    #[error("Home Assistant returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The response body was not the expected JSON shape.
    #[error("Home Assistant response was not valid JSON: {0}")]
    Decode(String),
    /// The client could not be constructed or the URL is invalid.
    #[error("Home Assistant client error: {0}")]
    Client(String),
}

/// Normalizes transport failures into [`HaError::Unreachable`].
fn transport_error(err: &reqwest::Error) -> HaError {
    let reason = if err.is_timeout() {
        "deadline elapsed".to_string()
    } else if err.is_connect() {
        "connection refused or host not found".to_string()
    } else {
        err.to_string()
    };
    HaError::Unreachable(reason)
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for the Home Assistant client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaConfig {
    /// Base URL, e.g. `http://homeassistant.local:8123`.
    pub base_url: String,
    /// Long-lived access token.
    pub token: String,
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
}

impl HaConfig {
    /// Builds a config with the default deadline.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Set Routing
// ============================================================================

/// How a `SET entity = value` is carried out remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetRoute {
    /// Routed to a domain service with a payload.
    Service {
        /// Service domain.
        domain: String,
        /// Service name.
        service: String,
    },
    /// Fallback direct state write.
    StateWrite,
}

/// Chooses the remote route for a state write.
///
/// Switchable domains map truthy/"on" values to `turn_on` and everything
/// else to `turn_off`; numeric and select domains use their setter
/// services; all other domains fall back to a direct state write.
#[must_use]
pub fn set_route(entity_id: &str, value: &Value) -> SetRoute {
    let domain = entity_id.split('.').next().unwrap_or_default();
    if SWITCHABLE_DOMAINS.contains(&domain) {
        let on = value.string_form().eq_ignore_ascii_case("on") || value.truthy();
        return SetRoute::Service {
            domain: domain.to_string(),
            service: if on { "turn_on" } else { "turn_off" }.to_string(),
        };
    }
    match domain {
        "input_number" | "number" => SetRoute::Service {
            domain: domain.to_string(),
            service: "set_value".to_string(),
        },
        "input_select" | "select" => SetRoute::Service {
            domain: domain.to_string(),
            service: "select_option".to_string(),
        },
        _ => SetRoute::StateWrite,
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Bounded REST client for Home Assistant.
#[derive(Debug, Clone)]
pub struct HomeAssistantClient {
    /// Connection settings.
    config: HaConfig,
    /// Shared HTTP client with the configured deadline.
    client: reqwest::Client,
}

impl HomeAssistantClient {
    /// Builds a client from config.
    ///
    /// # Errors
    ///
    /// Returns [`HaError::Client`] when the base URL is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: HaConfig) -> Result<Self, HaError> {
        Url::parse(&config.base_url).map_err(|err| HaError::Client(err.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| HaError::Client(err.to_string()))?;
        Ok(Self { config, client })
    }

    /// Builds a full API URL.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Issues a GET and decodes the JSON body.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, HaError> {
        let response = self
            .client
            .get(self.api_url(path))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;
        decode_response(response).await
    }

    /// Issues a POST with a JSON payload and decodes the JSON body.
    async fn post_json(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, HaError> {
        let response = self
            .client
            .post(self.api_url(path))
            .bearer_auth(&self.config.token)
            .json(payload)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;
        decode_response(response).await
    }

    /// Reads an entity and returns its `state` field.
    ///
    /// # Errors
    ///
    /// Returns [`HaError`] on transport, status, or decode failures.
    pub async fn get_state(&self, entity_id: &str) -> Result<Value, HaError> {
        let body = self.get_json(&format!("states/{entity_id}")).await?;
        let state = body
            .get("state")
            .cloned()
            .ok_or_else(|| HaError::Decode("missing 'state' field".to_string()))?;
        Ok(Value::from_json(&state))
    }

    /// Invokes `domain.service` with a payload.
    ///
    /// # Errors
    ///
    /// Returns [`HaError`] on transport, status, or decode failures.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, HaError> {
        self.post_json(&format!("services/{domain}/{service}"), payload)
            .await
    }

    /// Applies a state write via the routed service or a direct write.
    ///
    /// # Errors
    ///
    /// Returns [`HaError`] on transport, status, or decode failures.
    pub async fn set_state(&self, entity_id: &str, value: &Value) -> Result<SetRoute, HaError> {
        let route = set_route(entity_id, value);
        match &route {
            SetRoute::Service { domain, service } => {
                let payload = match service.as_str() {
                    "set_value" => serde_json::json!({
                        "entity_id": entity_id,
                        "value": value.to_json(),
                    }),
                    "select_option" => serde_json::json!({
                        "entity_id": entity_id,
                        "option": value.string_form(),
                    }),
                    _ => serde_json::json!({ "entity_id": entity_id }),
                };
                self.call_service(domain, service, &payload).await?;
            }
            SetRoute::StateWrite => {
                let payload = serde_json::json!({ "state": value.string_form() });
                self.post_json(&format!("states/{entity_id}"), &payload)
                    .await?;
            }
        }
        Ok(route)
    }

    /// Fetches recent state history for an entity.
    ///
    /// The upstream status, content type, and body pass through
    /// [`parse_history_response`], so error statuses and non-JSON bodies
    /// surface as a typed outcome instead of the strict decode path.
    ///
    /// # Errors
    ///
    /// Returns [`HaError`] only on transport failures; upstream status and
    /// body problems land on the returned [`HistoryResult`].
    pub async fn history(
        &self,
        entity_id: &str,
        hours: u32,
    ) -> Result<HistoryResult, HaError> {
        let response = self
            .client
            .get(self.api_url(&format!(
                "history/period?filter_entity_id={entity_id}&minimal_response&hours={hours}"
            )))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(&err))?;
        Ok(parse_history_response(status, &content_type, &body))
    }
}

/// Decodes a response, mapping bad statuses and bodies to typed errors.
async fn decode_response(response: reqwest::Response) -> Result<serde_json::Value, HaError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| transport_error(&err))?;
    if !status.is_success() {
        let mut truncated = body;
        truncated.truncate(512);
        return Err(HaError::Status {
            status: status.as_u16(),
            body: truncated,
        });
    }
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| HaError::Decode(err.to_string()))
}

// ============================================================================
// SECTION: History Parsing
// ============================================================================

/// Normalized outcome of a history proxy fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    /// True when the upstream answered with parseable JSON.
    pub ok: bool,
    /// Parsed payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure description otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pure, idempotent normalization of an upstream history response.
#[must_use]
pub fn parse_history_response(status: u16, content_type: &str, body: &str) -> HistoryResult {
    if !(200..300).contains(&status) {
        return HistoryResult {
            ok: false,
            data: None,
            error: Some(format!("upstream returned status {status}")),
        };
    }
    if !content_type.to_ascii_lowercase().contains("json") {
        return HistoryResult {
            ok: false,
            data: None,
            error: Some(format!("unexpected content type '{content_type}'")),
        };
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(data) => HistoryResult {
            ok: true,
            data: Some(data),
            error: None,
        },
        Err(err) => HistoryResult {
            ok: false,
            data: None,
            error: Some(format!("invalid JSON body: {err}")),
        },
    }
}
