// homescript-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Test Module: SQLite Store
// Coverage: CRUD, endpoint uniqueness, partial debug updates, durability.
// ============================================================================

//! ## Overview
//! Integration tests for the durable store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use homescript_core::DebugAccessSettings;
use homescript_core::DebugAccessStore;
use homescript_core::ScriptRecord;
use homescript_core::ScriptStore;
use homescript_core::ServiceAccount;
use homescript_core::ServiceAccountStore;
use homescript_core::StoreError;
use homescript_store_sqlite::SqliteStore;

/// Builds a minimal script record.
fn record(id: &str, endpoint: &str) -> ScriptRecord {
    ScriptRecord {
        id: id.to_string(),
        name: format!("script {id}"),
        endpoint: endpoint.to_string(),
        code: "PRINT 1".to_string(),
        debug_code: None,
        debug_enabled: false,
        test_params: None,
        trigger_config: Some(r#"{"logic":"AND","rules":[]}"#.to_string()),
        created_at: 1_700_000_000_000,
    }
}

#[test]
fn scripts_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&record("a", "morning-lights")).unwrap();
    let fetched = store.get("a").unwrap().unwrap();
    assert_eq!(fetched.endpoint, "morning-lights");
    assert_eq!(fetched.code, "PRINT 1");
    assert_eq!(fetched.created_at, 1_700_000_000_000);
    let by_endpoint = store.get_by_endpoint("morning-lights").unwrap().unwrap();
    assert_eq!(by_endpoint.id, "a");
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn endpoint_uniqueness_is_a_typed_conflict() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&record("a", "lights")).unwrap();
    let err = store.insert(&record("b", "lights")).unwrap_err();
    assert!(matches!(err, StoreError::EndpointConflict(_)));
}

#[test]
fn invalid_endpoints_are_rejected_before_sql() {
    let store = SqliteStore::open_in_memory().unwrap();
    let err = store.insert(&record("a", "Bad_Endpoint")).unwrap_err();
    assert!(matches!(err, StoreError::InvalidEndpoint(_)));
}

#[test]
fn updates_replace_in_place() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&record("a", "lights")).unwrap();
    let mut changed = record("a", "lights-2");
    changed.code = "PRINT 2".to_string();
    store.update(&changed).unwrap();
    let fetched = store.get("a").unwrap().unwrap();
    assert_eq!(fetched.endpoint, "lights-2");
    assert_eq!(fetched.code, "PRINT 2");
    assert!(matches!(
        store.update(&record("ghost", "ghost")),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn debug_updates_are_partial() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&record("a", "lights")).unwrap();
    store
        .update_debug("a", Some("PRINT 9".to_string()), None)
        .unwrap();
    let fetched = store.get("a").unwrap().unwrap();
    assert_eq!(fetched.debug_code.as_deref(), Some("PRINT 9"));
    assert!(!fetched.debug_enabled);
    store.update_debug("a", None, Some(true)).unwrap();
    let fetched = store.get("a").unwrap().unwrap();
    assert_eq!(fetched.debug_code.as_deref(), Some("PRINT 9"));
    assert!(fetched.debug_enabled);
}

#[test]
fn delete_removes_the_record() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert(&record("a", "lights")).unwrap();
    store.delete("a").unwrap();
    assert!(store.get("a").unwrap().is_none());
    assert!(matches!(store.delete("a"), Err(StoreError::NotFound)));
}

#[test]
fn service_accounts_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let account = ServiceAccount {
        id: "svc-1".to_string(),
        name: "dashboard".to_string(),
        secret: "shh".to_string(),
        created_at: 1_700_000_000_000,
    };
    store.insert_account(&account).unwrap();
    assert_eq!(store.find_account("svc-1").unwrap().unwrap(), account);
    assert_eq!(store.list_accounts().unwrap().len(), 1);
    store.delete_account("svc-1").unwrap();
    assert!(store.find_account("svc-1").unwrap().is_none());
}

#[test]
fn debug_access_settings_upsert() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(store.debug_access().unwrap(), DebugAccessSettings::default());
    let settings = DebugAccessSettings {
        enabled: true,
        allowed_cidrs: vec!["192.168.0.0/16".to_string()],
    };
    store.set_debug_access(&settings).unwrap();
    assert_eq!(store.debug_access().unwrap(), settings);
    let disabled = DebugAccessSettings {
        enabled: false,
        allowed_cidrs: vec![],
    };
    store.set_debug_access(&disabled).unwrap();
    assert_eq!(store.debug_access().unwrap(), disabled);
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scripts.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.insert(&record("a", "lights")).unwrap();
    }
    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.list().unwrap().len(), 1);
}
