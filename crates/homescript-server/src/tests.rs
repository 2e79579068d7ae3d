// homescript-server/src/tests.rs
// ============================================================================
// Test Module: Server Internals
// Coverage: Auth chain, constant-time compare, rate limiter, CIDR gate.
// ============================================================================

//! ## Overview
//! Unit tests for auth, rate limiting, and the debug-access gate.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use std::net::IpAddr;
use std::sync::Arc;

use homescript_config::RateLimitSection;
use homescript_core::AuthMode;
use homescript_core::InMemoryStore;
use homescript_core::ServiceAccount;
use homescript_core::ServiceAccountStore;

use crate::auth::Credentials;
use crate::auth::authorize_admin;
use crate::auth::constant_time_eq;
use crate::debug_access::ip_allowed;
use crate::debug_access::parse_cidrs;
use crate::rate_limit::RateLimiter;

/// Builds an account store with one service account.
fn accounts() -> Arc<dyn ServiceAccountStore> {
    let store = InMemoryStore::new();
    store
        .insert_account(&ServiceAccount {
            id: "svc-1".to_string(),
            name: "dashboard".to_string(),
            secret: "hunter2".to_string(),
            created_at: 0,
        })
        .unwrap();
    Arc::new(store)
}

// ========================================================================
// Auth
// ========================================================================

#[test]
fn bearer_tokens_authorize_as_jwt() {
    let credentials = Credentials {
        bearer: Some("tok".to_string()),
        ..Credentials::default()
    };
    let mode = authorize_admin(&credentials, &["tok".to_string()], &accounts(), false);
    assert_eq!(mode, Some(AuthMode::Jwt));
}

#[test]
fn wrong_bearer_is_denied() {
    let credentials = Credentials {
        bearer: Some("nope".to_string()),
        ..Credentials::default()
    };
    assert_eq!(
        authorize_admin(&credentials, &["tok".to_string()], &accounts(), false),
        None
    );
}

#[test]
fn service_pairs_authorize_as_service_key() {
    let credentials = Credentials {
        service_id: Some("svc-1".to_string()),
        service_secret: Some("hunter2".to_string()),
        ..Credentials::default()
    };
    let mode = authorize_admin(&credentials, &[], &accounts(), false);
    assert_eq!(mode, Some(AuthMode::ServiceKey));
}

#[test]
fn wrong_service_secret_is_denied() {
    let credentials = Credentials {
        service_id: Some("svc-1".to_string()),
        service_secret: Some("wrong".to_string()),
        ..Credentials::default()
    };
    assert_eq!(authorize_admin(&credentials, &[], &accounts(), false), None);
}

#[test]
fn mock_passthrough_requires_no_tokens_configured() {
    let bare = Credentials::default();
    assert_eq!(
        authorize_admin(&bare, &[], &accounts(), true),
        Some(AuthMode::Mock)
    );
    assert_eq!(
        authorize_admin(&bare, &["tok".to_string()], &accounts(), true),
        None
    );
    assert_eq!(authorize_admin(&bare, &[], &accounts(), false), None);
}

#[test]
fn constant_time_compare_handles_lengths() {
    assert!(constant_time_eq("secret", "secret"));
    assert!(!constant_time_eq("secret", "secret2"));
    assert!(!constant_time_eq("secret", "Secret"));
    assert!(!constant_time_eq("", "x"));
    assert!(constant_time_eq("", ""));
}

// ========================================================================
// Rate Limiting
// ========================================================================

#[test]
fn limiter_denies_beyond_the_window_budget() {
    let limiter = RateLimiter::new(RateLimitSection {
        enabled: true,
        max_requests: 3,
        window_ms: 60_000,
        max_entries: 16,
    });
    assert!(limiter.check("10.0.0.1", "lights"));
    assert!(limiter.check("10.0.0.1", "lights"));
    assert!(limiter.check("10.0.0.1", "lights"));
    assert!(!limiter.check("10.0.0.1", "lights"));
    // Another caller and another endpoint have their own windows.
    assert!(limiter.check("10.0.0.2", "lights"));
    assert!(limiter.check("10.0.0.1", "other"));
}

#[test]
fn disabled_limiter_allows_everything() {
    let limiter = RateLimiter::new(RateLimitSection {
        enabled: false,
        max_requests: 1,
        window_ms: 1_000,
        max_entries: 1,
    });
    for _ in 0..100 {
        assert!(limiter.check("10.0.0.1", "lights"));
    }
}

// ========================================================================
// Debug Access
// ========================================================================

#[test]
fn cidr_gate_matches_membership() {
    let allowed = parse_cidrs(&[
        "192.168.1.0/24".to_string(),
        "bogus".to_string(),
        "10.0.0.0/8".to_string(),
    ]);
    assert_eq!(allowed.len(), 2);
    let inside: IpAddr = "192.168.1.44".parse().unwrap();
    let also_inside: IpAddr = "10.20.30.40".parse().unwrap();
    let outside: IpAddr = "8.8.8.8".parse().unwrap();
    assert!(ip_allowed(inside, &allowed));
    assert!(ip_allowed(also_inside, &allowed));
    assert!(!ip_allowed(outside, &allowed));
}

#[test]
fn empty_allowlist_denies_everyone() {
    let loopback: IpAddr = "127.0.0.1".parse().unwrap();
    assert!(!ip_allowed(loopback, &[]));
}
