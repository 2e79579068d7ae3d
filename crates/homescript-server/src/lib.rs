// homescript-server/src/lib.rs
// ============================================================================
// Module: HomeScript Server Root
// Description: Public API surface for the HTTP layer.
// Purpose: Wire together auth, rate limiting, debug access, and routes.
// Dependencies: crate::{audit, auth, debug_access, rate_limit, routes}
// ============================================================================

//! ## Overview
//! The HTTP layer is a thin adapter around the execution host: explicit
//! per-route auth checks, a fixed-window rate limiter, a CIDR-gated LAN
//! debugging path, and audit events for every request. Interpreter failures
//! map to 400 with the full report; rate-limit denials to 429; anything
//! unexpected to 500.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod debug_access;
pub mod rate_limit;
pub mod routes;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::HttpAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::authorize_admin;
pub use debug_access::ip_allowed;
pub use debug_access::parse_cidrs;
pub use rate_limit::RateLimiter;
pub use routes::AppState;
pub use routes::router;
