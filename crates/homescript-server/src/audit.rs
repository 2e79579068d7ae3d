// homescript-server/src/audit.rs
// ============================================================================
// Module: HTTP Audit Logging
// Description: Structured audit events for request handling.
// Purpose: Emit serialized events without hard logging dependencies.
// Dependencies: homescript-core, serde
// ============================================================================

//! ## Overview
//! Audit events are serializable payloads routed through a sink trait so
//! deployments can choose stderr JSON lines, an append-only file, or
//! nothing. Nothing else in the server writes to stdout or stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use homescript_core::AuthMode;
use homescript_core::now_ms;
use serde::Serialize;

// ============================================================================
// SECTION: Event
// ============================================================================

/// One handled-request audit event.
#[derive(Debug, Clone, Serialize)]
pub struct HttpAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Request method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Response status.
    pub status: u16,
    /// Credential path when one authorized the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_mode: Option<AuthMode>,
    /// Peer IP when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_ip: Option<String>,
    /// Handling duration in milliseconds.
    pub duration_ms: u64,
}

impl HttpAuditEvent {
    /// Builds a handled-request event.
    #[must_use]
    pub fn request(method: &str, path: &str, status: u16, duration_ms: u64) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_ms(),
            method: method.to_string(),
            path: path.to_string(),
            status,
            auth_mode: None,
            peer_ip: None,
            duration_ms,
        }
    }

    /// Returns a copy with the peer IP attached.
    #[must_use]
    pub fn with_peer(mut self, peer_ip: impl Into<String>) -> Self {
        self.peer_ip = Some(peer_ip.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Receives one event.
    fn emit(&self, event: HttpAuditEvent);
}

/// Sink that drops all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: HttpAuditEvent) {}
}

/// Sink that writes JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn emit(&self, event: HttpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// Guarded append handle.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens (or creates) the audit file in append mode.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file cannot be opened.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn emit(&self, event: HttpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(&event) {
            if let Ok(mut file) = self.file.lock() {
                let _ = writeln!(file, "{payload}");
            }
        }
    }
}
