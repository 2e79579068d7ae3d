// homescript-server/src/auth.rs
// ============================================================================
// Module: Request Authentication
// Description: Credential checks for the admin surface.
// Purpose: Fail-closed bearer/service-key auth with constant-time compares.
// Dependencies: homescript-core, subtle
// ============================================================================

//! ## Overview
//! Admin endpoints accept a bearer token (the `jwt` auth mode) or a
//! service-credential header pair (`service_key`). A mock deployment with
//! no tokens configured passes through as `mock`. All decisions are
//! fail-closed and token comparisons are constant-time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use homescript_core::AuthMode;
use homescript_core::ServiceAccountStore;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the service account id.
pub const SERVICE_ID_HEADER: &str = "x-service-id";
/// Header carrying the service account secret.
pub const SERVICE_SECRET_HEADER: &str = "x-service-secret";
/// Maximum accepted authorization header length.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Credentials extracted from request headers.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Bearer token from `Authorization`.
    pub bearer: Option<String>,
    /// Service account id header.
    pub service_id: Option<String>,
    /// Service account secret header.
    pub service_secret: Option<String>,
}

impl Credentials {
    /// Extracts credentials from an axum header map.
    #[must_use]
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let bearer = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.len() <= MAX_AUTH_HEADER_BYTES)
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        let header_string = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Self {
            bearer,
            service_id: header_string(SERVICE_ID_HEADER),
            service_secret: header_string(SERVICE_SECRET_HEADER),
        }
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Constant-time equality that also hides length differences.
#[must_use]
pub fn constant_time_eq(left: &str, right: &str) -> bool {
    let length_ok = left.len() == right.len();
    let padded_left = left.as_bytes();
    let padded_right = if length_ok { right.as_bytes() } else { padded_left };
    bool::from(padded_left.ct_eq(padded_right)) && length_ok
}

/// Authorizes an admin-surface request.
///
/// Order: bearer token, then service-credential pair, then mock
/// passthrough (mock deployment with no tokens configured). Returns `None`
/// when no credential path authorizes the caller.
#[must_use]
pub fn authorize_admin(
    credentials: &Credentials,
    api_tokens: &[String],
    accounts: &Arc<dyn ServiceAccountStore>,
    mock_passthrough: bool,
) -> Option<AuthMode> {
    if let Some(bearer) = &credentials.bearer {
        if api_tokens.iter().any(|token| constant_time_eq(token, bearer)) {
            return Some(AuthMode::Jwt);
        }
    }
    if let (Some(id), Some(secret)) = (&credentials.service_id, &credentials.service_secret) {
        if let Ok(Some(account)) = accounts.find_account(id) {
            if constant_time_eq(&account.secret, secret) {
                return Some(AuthMode::ServiceKey);
            }
        }
    }
    if mock_passthrough && api_tokens.is_empty() {
        return Some(AuthMode::Mock);
    }
    None
}
