// homescript-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: The HTTP surface of the automation service.
// Purpose: Script CRUD, run/webhook execution, debug access, history proxy.
// Dependencies: crate::{audit, auth, debug_access, rate_limit}, axum,
//              homescript-core, homescript-trigger
// ============================================================================

//! ## Overview
//! Every route performs its own explicit auth check and every script
//! execution flows through the shared [`ScriptRunner`], so the response
//! always carries a complete execution report. Status mapping: interpreter
//! failures return 400 (or the interpreter-supplied status) with the
//! report, rate-limit denials 429, auth failures 401/403, unexpected
//! failures 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use homescript_config::HomescriptConfig;
use homescript_core::AuthMode;
use homescript_core::DebugAccessStore;
use homescript_core::ExecutionReport;
use homescript_core::HistoryResult;
use homescript_core::HomeAssistantClient;
use homescript_core::RunOptions;
use homescript_core::ScriptRecord;
use homescript_core::ScriptRunner;
use homescript_core::ScriptStore;
use homescript_core::ServiceAccountStore;
use homescript_core::StoreError;
use homescript_core::now_ms;
use homescript_lang::Value;
use homescript_trigger::normalize_trigger_config;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::audit::HttpAuditEvent;
use crate::auth::Credentials;
use crate::auth::SERVICE_ID_HEADER;
use crate::auth::authorize_admin;
use crate::debug_access::ip_allowed;
use crate::debug_access::parse_cidrs;
use crate::rate_limit::RateLimiter;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared server state.
pub struct AppState {
    /// Validated configuration.
    pub config: HomescriptConfig,
    /// Script persistence.
    pub scripts: Arc<dyn ScriptStore>,
    /// Service-account persistence.
    pub accounts: Arc<dyn ServiceAccountStore>,
    /// Debug-access settings persistence.
    pub debug_settings: Arc<dyn DebugAccessStore>,
    /// Shared execution host.
    pub runner: Arc<ScriptRunner>,
    /// Live HA client for the history proxy, when configured.
    pub ha: Option<Arc<HomeAssistantClient>>,
    /// Fixed-window rate limiter.
    pub rate_limiter: RateLimiter,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
}

/// Builds the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/scripts", get(list_scripts).post(create_script))
        .route(
            "/api/scripts/{id}",
            get(get_script).put(update_script).delete(delete_script),
        )
        .route("/api/scripts/{id}/debug", put(update_debug))
        .route("/api/run/{endpoint}", get(run_script).post(run_script))
        .route("/api/webhook/{endpoint}", post(webhook))
        .route("/api/debug-access/public", get(debug_access_public))
        .route("/api/debug-access/run/{endpoint}", post(debug_access_run))
        .route("/api/history", get(history))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            audit_layer,
        ))
        .with_state(state)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Typed API failure rendered as `{error}` JSON.
#[derive(Debug)]
pub struct ApiError {
    /// Response status.
    status: StatusCode,
    /// Failure message.
    message: String,
}

impl ApiError {
    /// 400 with a message.
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 401 for missing/invalid credentials.
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "authentication required".to_string(),
        }
    }

    /// 403 for the debug-access gate.
    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    /// 404 for missing resources.
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    /// 429 for rate-limit denials.
    fn too_many_requests() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limit exceeded".to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::EndpointConflict(_) => StatusCode::CONFLICT,
            StoreError::InvalidEndpoint(_) => StatusCode::BAD_REQUEST,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Emits one audit event per handled request.
async fn audit_layer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    state.audit.emit(
        HttpAuditEvent::request(&method, &path, response.status().as_u16(), duration_ms)
            .with_peer(peer.ip().to_string()),
    );
    response
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs the admin auth chain or fails with 401.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AuthMode, ApiError> {
    let credentials = Credentials::from_headers(headers);
    authorize_admin(
        &credentials,
        &state.config.server.api_tokens,
        &state.accounts,
        state.config.home_assistant.mock,
    )
    .ok_or_else(ApiError::unauthorized)
}

/// Applies the rate limiter for one caller/endpoint pair.
fn check_rate(state: &AppState, peer: SocketAddr, endpoint: &str) -> Result<(), ApiError> {
    if state.rate_limiter.check(&peer.ip().to_string(), endpoint) {
        Ok(())
    } else {
        Err(ApiError::too_many_requests())
    }
}

/// Parses an optional JSON request body.
fn parse_body(body: &Bytes) -> Result<Option<serde_json::Value>, ApiError> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}

/// Merges query-string and JSON-body parameters; the body wins.
fn merge_params(
    query: &HashMap<String, String>,
    body: Option<&serde_json::Value>,
) -> BTreeMap<String, Value> {
    let mut params: BTreeMap<String, Value> = query
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    if let Some(serde_json::Value::Object(entries)) = body {
        for (name, value) in entries {
            params.insert(name.clone(), Value::from_json(value));
        }
    }
    params
}

/// Renders an execution report with the status it carries.
fn report_response(report: ExecutionReport) -> Response {
    let status =
        StatusCode::from_u16(report.meta.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if report.success {
        let payload = serde_json::json!({
            "output": report.output,
            "variables": report.variables,
            "report": report,
        });
        (status, Json(payload)).into_response()
    } else {
        let (message, line) = report
            .error
            .as_ref()
            .map_or((String::new(), None), |error| {
                (error.message.clone(), error.line)
            });
        let payload = serde_json::json!({
            "error": message,
            "line": line,
            "report": report,
        });
        (status, Json(payload)).into_response()
    }
}

/// Serializes a trigger-config body field through normalization.
fn store_trigger_config(raw: Option<&serde_json::Value>) -> Option<String> {
    match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(normalize_trigger_config(value).to_string()),
    }
}

/// Serializes the test-params body field.
fn store_test_params(raw: Option<&serde_json::Value>) -> Option<String> {
    match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(value) => Some(value.to_string()),
    }
}

// ============================================================================
// SECTION: Config Endpoint
// ============================================================================

/// `GET /api/config`
async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "mock": state.config.home_assistant.mock }))
}

// ============================================================================
// SECTION: Script CRUD
// ============================================================================

/// Body for script create/update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ScriptBody {
    /// Display name.
    name: String,
    /// URL-safe endpoint.
    endpoint: String,
    /// Main source text.
    code: String,
    /// Parameter-test JSON.
    #[serde(default)]
    test_params: Option<serde_json::Value>,
    /// Trigger config JSON, normalized at write time.
    #[serde(default)]
    trigger_config: Option<serde_json::Value>,
    /// Debug draft flag.
    #[serde(default)]
    debug_enabled: Option<bool>,
    /// Debug draft source.
    #[serde(default)]
    debug_code: Option<String>,
}

/// `GET /api/scripts`
async fn list_scripts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ScriptRecord>>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.scripts.list()?))
}

/// `POST /api/scripts`
async fn create_script(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ScriptBody>,
) -> Result<(StatusCode, Json<ScriptRecord>), ApiError> {
    require_admin(&state, &headers)?;
    let record = ScriptRecord {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        endpoint: body.endpoint,
        code: body.code,
        debug_code: body.debug_code,
        debug_enabled: body.debug_enabled.unwrap_or(false),
        test_params: store_test_params(body.test_params.as_ref()),
        trigger_config: store_trigger_config(body.trigger_config.as_ref()),
        created_at: now_ms(),
    };
    state.scripts.insert(&record)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/scripts/{id}`
async fn get_script(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ScriptRecord>, ApiError> {
    require_admin(&state, &headers)?;
    state
        .scripts
        .get(&id)?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// `PUT /api/scripts/{id}`
async fn update_script(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ScriptBody>,
) -> Result<Json<ScriptRecord>, ApiError> {
    require_admin(&state, &headers)?;
    let existing = state.scripts.get(&id)?.ok_or_else(ApiError::not_found)?;
    let record = ScriptRecord {
        id: existing.id,
        name: body.name,
        endpoint: body.endpoint,
        code: body.code,
        debug_code: body.debug_code.or(existing.debug_code),
        debug_enabled: body.debug_enabled.unwrap_or(existing.debug_enabled),
        test_params: store_test_params(body.test_params.as_ref()).or(existing.test_params),
        trigger_config: store_trigger_config(body.trigger_config.as_ref()),
        created_at: existing.created_at,
    };
    state.scripts.update(&record)?;
    Ok(Json(record))
}

/// `DELETE /api/scripts/{id}`
async fn delete_script(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    state.scripts.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body for the debug-draft partial update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DebugBody {
    /// New debug draft source, when updating it.
    #[serde(default)]
    debug_code: Option<String>,
    /// New debug flag, when updating it.
    #[serde(default)]
    debug_enabled: Option<bool>,
}

/// `PUT /api/scripts/{id}/debug`
async fn update_debug(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<DebugBody>,
) -> Result<Json<ScriptRecord>, ApiError> {
    require_admin(&state, &headers)?;
    state
        .scripts
        .update_debug(&id, body.debug_code, body.debug_enabled)?;
    state
        .scripts
        .get(&id)?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

// ============================================================================
// SECTION: Execution Endpoints
// ============================================================================

/// `GET|POST /api/run/{endpoint}`
async fn run_script(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let auth_mode = require_admin(&state, &headers)?;
    check_rate(&state, peer, &endpoint)?;
    let script = state
        .scripts
        .get_by_endpoint(&endpoint)?
        .ok_or_else(ApiError::not_found)?;
    let parsed_body = parse_body(&body)?;
    let params = merge_params(&query, parsed_body.as_ref());
    let options = RunOptions::for_endpoint(&endpoint)
        .with_params(params)
        .with_auth_mode(auth_mode);
    let report = state.runner.execute(&script.code, options).await;
    Ok(report_response(report))
}

/// `POST /api/webhook/{endpoint}` — unauthenticated execution path.
async fn webhook(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_rate(&state, peer, &endpoint)?;
    let script = state
        .scripts
        .get_by_endpoint(&endpoint)?
        .ok_or_else(ApiError::not_found)?;
    let parsed_body = parse_body(&body)?;

    let mut params = merge_params(&query, None);
    params.insert(
        "webhook_data".to_string(),
        parsed_body
            .as_ref()
            .map_or(Value::Null, |value| Value::from_json(value)),
    );
    params.insert(
        "webhook_query".to_string(),
        Value::from_json(&serde_json::json!(query)),
    );

    let options = RunOptions::for_endpoint(&endpoint)
        .with_params(params)
        .with_auth_mode(AuthMode::Unknown);
    let report = state.runner.execute(&script.code, options).await;
    Ok(report_response(report))
}

// ============================================================================
// SECTION: Debug Access
// ============================================================================

/// `GET /api/debug-access/public`
async fn debug_access_public(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stored = state.debug_settings.debug_access()?;
    let enabled = state.config.debug_access.enabled || stored.enabled;
    Ok(Json(serde_json::json!({ "enabled": enabled })))
}

/// `POST /api/debug-access/run/{endpoint}` — whitelist-IP-gated execution.
///
/// The caller must originate inside an allowed CIDR block and present a
/// valid service id; the service secret check is bypassed.
async fn debug_access_run(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let stored = state.debug_settings.debug_access()?;
    let enabled = state.config.debug_access.enabled || stored.enabled;
    if !enabled {
        return Err(ApiError::forbidden("debug access is disabled"));
    }

    let mut cidrs = parse_cidrs(&state.config.debug_access.allowed_cidrs);
    cidrs.extend(parse_cidrs(&stored.allowed_cidrs));
    if !ip_allowed(peer.ip(), &cidrs) {
        return Err(ApiError::forbidden("caller address is not allowed"));
    }

    let service_id = headers
        .get(SERVICE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("service id required"))?;
    if state.accounts.find_account(service_id)?.is_none() {
        return Err(ApiError::forbidden("unknown service id"));
    }

    check_rate(&state, peer, &endpoint)?;
    let script = state
        .scripts
        .get_by_endpoint(&endpoint)?
        .ok_or_else(ApiError::not_found)?;
    let parsed_body = parse_body(&body)?;
    let params = merge_params(&query, parsed_body.as_ref());
    let options = RunOptions::for_endpoint(&endpoint)
        .with_params(params)
        .with_auth_mode(AuthMode::DebugBypass);
    let source = script.effective_debug_code().to_string();
    let report = state.runner.execute(&source, options).await;
    Ok(report_response(report))
}

// ============================================================================
// SECTION: History Proxy
// ============================================================================

/// Query parameters for the history proxy.
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    /// Target entity.
    #[serde(rename = "entityId")]
    entity_id: Option<String>,
    /// Lookback window in hours.
    hours: Option<u32>,
}

/// `GET /api/history?entityId=…&hours=…`
async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;
    let entity_id = query
        .entity_id
        .ok_or_else(|| ApiError::bad_request("entityId is required"))?;
    let hours = query.hours.unwrap_or(24);

    let Some(client) = &state.ha else {
        let mock = HistoryResult {
            ok: true,
            data: Some(serde_json::json!([])),
            error: None,
        };
        return Ok(Json(mock).into_response());
    };

    match client.history(&entity_id, hours).await {
        Ok(result) if result.ok => Ok(Json(result).into_response()),
        Ok(result) => Ok((StatusCode::BAD_GATEWAY, Json(result)).into_response()),
        Err(err) => Ok((
            StatusCode::BAD_GATEWAY,
            Json(HistoryResult {
                ok: false,
                data: None,
                error: Some(err.to_string()),
            }),
        )
            .into_response()),
    }
}
