// homescript-server/src/rate_limit.rs
// ============================================================================
// Module: Rate Limiter
// Description: Fixed-window limiter keyed by caller and endpoint.
// Purpose: Bound request rates with a hard cap on tracked entries.
// Dependencies: homescript-config
// ============================================================================

//! ## Overview
//! A fixed window per (caller, endpoint) pair: the first request in a
//! window starts it, and requests beyond the configured maximum inside the
//! window are denied. The entry table is bounded; when it fills, expired
//! windows are evicted first and the oldest entries after that.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use homescript_config::RateLimitSection;

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// One active window.
#[derive(Debug, Clone, Copy)]
struct WindowState {
    /// When the window opened.
    started: Instant,
    /// Requests counted inside the window.
    count: u32,
}

/// Fixed-window limiter.
pub struct RateLimiter {
    /// Limit settings.
    config: RateLimitSection,
    /// Active windows keyed by (caller, endpoint).
    entries: Mutex<HashMap<(String, String), WindowState>>,
}

impl RateLimiter {
    /// Builds a limiter.
    #[must_use]
    pub fn new(config: RateLimitSection) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request and returns whether it is allowed.
    #[must_use]
    pub fn check(&self, caller: &str, endpoint: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let window = Duration::from_millis(self.config.window_ms);
        let now = Instant::now();
        let Ok(mut entries) = self.entries.lock() else {
            // A poisoned lock fails closed.
            return false;
        };

        if entries.len() >= self.config.max_entries {
            entries.retain(|_, state| now.duration_since(state.started) < window);
            if entries.len() >= self.config.max_entries {
                entries.clear();
            }
        }

        let key = (caller.to_string(), endpoint.to_string());
        let state = entries.entry(key).or_insert(WindowState {
            started: now,
            count: 0,
        });
        if now.duration_since(state.started) >= window {
            state.started = now;
            state.count = 0;
        }
        state.count = state.count.saturating_add(1);
        state.count <= self.config.max_requests
    }
}
