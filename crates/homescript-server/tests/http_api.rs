// homescript-server/tests/http_api.rs
// ============================================================================
// Test Module: HTTP API
// Coverage: Auth, CRUD, run/webhook execution, rate limit, debug access.
// ============================================================================

//! ## Overview
//! End-to-end tests over a real listener with an in-memory store and a
//! dry-run execution host.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use std::net::SocketAddr;
use std::sync::Arc;

use homescript_config::HomescriptConfig;
use homescript_core::HaTarget;
use homescript_core::InMemoryStore;
use homescript_core::ScriptRunner;
use homescript_core::ScriptStore;
use homescript_core::ServiceAccount;
use homescript_core::ServiceAccountStore;
use homescript_server::AppState;
use homescript_server::NoopAuditSink;
use homescript_server::RateLimiter;
use homescript_server::router;

/// Admin token used across the tests.
const TOKEN: &str = "test-token";

/// Boots the API on an ephemeral port and returns its base URL.
async fn spawn_app(config: HomescriptConfig, store: Arc<InMemoryStore>) -> String {
    let scripts: Arc<dyn ScriptStore> = store.clone();
    let runner = Arc::new(ScriptRunner::new(HaTarget::DryRun, Some(Arc::clone(&scripts))));
    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(config.rate_limit.clone()),
        config,
        scripts,
        accounts: store.clone(),
        debug_settings: store.clone(),
        runner,
        ha: None,
        audit: Arc::new(NoopAuditSink),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Default test configuration: one admin token, generous rate limit.
fn test_config() -> HomescriptConfig {
    let mut config = HomescriptConfig::default();
    config.server.api_tokens = vec![TOKEN.to_string()];
    config.rate_limit.max_requests = 1_000;
    config
}

/// Creates a script over the API and returns its id.
async fn create_script(client: &reqwest::Client, base: &str, endpoint: &str, code: &str) -> String {
    let response = client
        .post(format!("{base}/api/scripts"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({
            "name": endpoint,
            "endpoint": endpoint,
            "code": code,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn config_endpoint_reports_mock_flag() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let body: serde_json::Value = reqwest::get(format!("{base}/api/config"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "mock": true }));
}

#[tokio::test]
async fn admin_surface_requires_credentials() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    let denied = client
        .get(format!("{base}/api/scripts"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 401);
    let allowed = client
        .get(format!("{base}/api/scripts"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status().as_u16(), 200);
}

#[tokio::test]
async fn script_crud_round_trips() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    let id = create_script(&client, &base, "morning-lights", "PRINT 1\n").await;

    let fetched: serde_json::Value = client
        .get(format!("{base}/api/scripts/{id}"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["endpoint"], "morning-lights");
    assert_eq!(fetched["debugEnabled"], serde_json::json!(false));

    let updated = client
        .put(format!("{base}/api/scripts/{id}/debug"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({ "debugCode": "PRINT 2\n", "debugEnabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status().as_u16(), 200);
    let body: serde_json::Value = updated.json().await.unwrap();
    assert_eq!(body["debugCode"], "PRINT 2\n");
    assert_eq!(body["debugEnabled"], serde_json::json!(true));

    let deleted = client
        .delete(format!("{base}/api/scripts/{id}"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
}

#[tokio::test]
async fn duplicate_endpoints_conflict() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    create_script(&client, &base, "lights", "PRINT 1\n").await;
    let conflict = client
        .post(format!("{base}/api/scripts"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({
            "name": "again",
            "endpoint": "lights",
            "code": "PRINT 2\n",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(conflict.status().as_u16(), 409);
}

#[tokio::test]
async fn run_endpoint_merges_query_and_body() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    create_script(
        &client,
        &base,
        "greeter",
        "REQUIRED $mode\nPRINT \"mode=$mode who=$who\"\n",
    )
    .await;

    let response = client
        .post(format!("{base}/api/run/greeter?mode=query&who=operator"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({ "mode": "body-wins" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["output"], serde_json::json!(["mode=body-wins who=operator"]));
    assert_eq!(body["report"]["success"], serde_json::json!(true));
    assert_eq!(body["report"]["meta"]["authMode"], "jwt");
}

#[tokio::test]
async fn failed_runs_return_the_report_with_400() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    create_script(&client, &base, "strict", "REQUIRED $mode\nPRINT $mode\n").await;
    let response = client
        .get(format!("{base}/api/run/strict"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required query variable: mode");
    assert_eq!(body["report"]["success"], serde_json::json!(false));
}

#[tokio::test]
async fn unknown_endpoints_return_404() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base}/api/run/ghost"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn webhook_is_unauthenticated_and_binds_payloads() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    create_script(
        &client,
        &base,
        "hook",
        "PRINT $webhook_data.level\nPRINT $source\n",
    )
    .await;
    let response = client
        .post(format!("{base}/api/webhook/hook?source=sensor"))
        .json(&serde_json::json!({ "level": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["output"], serde_json::json!(["7", "sensor"]));
}

#[tokio::test]
async fn rate_limits_surface_as_429() {
    let mut config = test_config();
    config.rate_limit.max_requests = 2;
    config.rate_limit.window_ms = 60_000;
    let base = spawn_app(config, Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    create_script(&client, &base, "limited", "PRINT 1\n").await;
    for _ in 0..2 {
        let ok = client
            .get(format!("{base}/api/run/limited"))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status().as_u16(), 200);
    }
    let limited = client
        .get(format!("{base}/api/run/limited"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(limited.status().as_u16(), 429);
}

#[tokio::test]
async fn debug_access_gate_checks_ip_and_service_id() {
    let mut config = test_config();
    config.debug_access.enabled = true;
    config.debug_access.allowed_cidrs = vec!["127.0.0.0/8".to_string()];
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_account(&ServiceAccount {
            id: "svc-lan".to_string(),
            name: "lan debugger".to_string(),
            secret: "irrelevant".to_string(),
            created_at: 0,
        })
        .unwrap();
    let base = spawn_app(config, Arc::clone(&store)).await;
    let client = reqwest::Client::new();
    let id = create_script(&client, &base, "draft", "PRINT \"main\"\n").await;
    client
        .put(format!("{base}/api/scripts/{id}/debug"))
        .bearer_auth(TOKEN)
        .json(&serde_json::json!({ "debugCode": "PRINT \"draft\"\n", "debugEnabled": true }))
        .send()
        .await
        .unwrap();

    // Without a service id the gate refuses.
    let refused = client
        .post(format!("{base}/api/debug-access/run/draft"))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status().as_u16(), 403);

    // With a valid service id the debug draft runs.
    let allowed = client
        .post(format!("{base}/api/debug-access/run/draft"))
        .header("x-service-id", "svc-lan")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status().as_u16(), 200);
    let body: serde_json::Value = allowed.json().await.unwrap();
    assert_eq!(body["output"], serde_json::json!(["draft"]));
    assert_eq!(body["report"]["meta"]["authMode"], "debug_bypass");
}

#[tokio::test]
async fn debug_access_public_probe_is_unauthenticated() {
    let mut config = test_config();
    config.debug_access.enabled = true;
    let base = spawn_app(config, Arc::new(InMemoryStore::new())).await;
    let body: serde_json::Value = reqwest::get(format!("{base}/api/debug-access/public"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "enabled": true }));
}

#[tokio::test]
async fn history_without_live_ha_returns_empty() {
    let base = spawn_app(test_config(), Arc::new(InMemoryStore::new())).await;
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .get(format!("{base}/api/history?entityId=sensor.temp&hours=2"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], serde_json::json!(true));
    assert_eq!(body["data"], serde_json::json!([]));
}
