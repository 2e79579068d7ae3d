// homescript-lang/src/error.rs
// ============================================================================
// Module: HomeScript Error Model
// Description: Canonical interpreter failure type.
// Purpose: Carry a message, the offending line, and an optional halt status.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`HomeScriptError`] is the single failure type produced by parsing and
//! execution. Host-callback failures are wrapped into it with the statement
//! name prefixed so every failure a script author sees names the statement
//! that raised it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Canonical HomeScript failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct HomeScriptError {
    /// Human-readable failure message.
    pub message: String,
    /// 1-based physical line the failure was observed on, when known.
    pub line: Option<u32>,
    /// Run status requested by a `BREAK <code>` statement, when applicable.
    pub status: Option<u16>,
}

impl HomeScriptError {
    /// Builds an error without line information.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            status: None,
        }
    }

    /// Builds an error anchored to a physical line.
    #[must_use]
    pub fn at_line(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            status: None,
        }
    }

    /// Returns a copy with the line set when not already present.
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Returns a copy with the halt status attached.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true when this failure is the debugger stop sentinel.
    #[must_use]
    pub fn is_debugger_stop(&self) -> bool {
        self.message == DEBUGGER_STOPPED
    }
}

/// Message used when the operator stops a run through the debugger.
pub const DEBUGGER_STOPPED: &str = "Debugger stopped";
