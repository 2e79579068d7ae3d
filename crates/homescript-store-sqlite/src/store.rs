// homescript-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store
// Description: Durable store for scripts, accounts, and debug access.
// Purpose: Implement the core store traits over a WAL-mode connection.
// Dependencies: homescript-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! One connection guarded by a mutex serves all requests; SQLite WAL plus a
//! busy timeout keeps concurrent readers cheap. The endpoint uniqueness
//! invariant lives in the schema as a UNIQUE index and surfaces as a typed
//! conflict error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;

use homescript_core::DebugAccessSettings;
use homescript_core::DebugAccessStore;
use homescript_core::ScriptRecord;
use homescript_core::ScriptStore;
use homescript_core::ServiceAccount;
use homescript_core::ServiceAccountStore;
use homescript_core::StoreError;
use homescript_core::validate_endpoint;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Store schema version stamped into `user_version`.
pub const SCHEMA_VERSION: i64 = 1;
/// Busy timeout in milliseconds.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Table definitions.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scripts (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    endpoint       TEXT NOT NULL UNIQUE,
    code           TEXT NOT NULL,
    debug_code     TEXT,
    debug_enabled  INTEGER NOT NULL DEFAULT 0,
    test_params    TEXT,
    trigger_config TEXT,
    created_at     INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS service_accounts (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    secret     TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS debug_access (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    enabled       INTEGER NOT NULL DEFAULT 0,
    allowed_cidrs TEXT NOT NULL DEFAULT '[]'
);
";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable store over one SQLite connection.
pub struct SqliteStore {
    /// Guarded connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and migrates) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the database cannot be opened
    /// or initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::initialize(conn)
    }

    /// Opens an in-memory store, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when initialization fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::initialize(conn)
    }

    /// Applies pragmas and the schema.
    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL").map_err(backend)?;
        conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS.to_string())
            .map_err(backend)?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION.to_string())
            .map_err(backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))
    }
}

/// Maps any rusqlite error to a backend failure.
fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Maps a rusqlite error, turning unique-constraint hits into conflicts.
fn write_error(err: rusqlite::Error, endpoint: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return StoreError::EndpointConflict(endpoint.to_string());
        }
    }
    backend(err)
}

/// Decodes one scripts row.
fn script_from_row(row: &Row<'_>) -> rusqlite::Result<ScriptRecord> {
    Ok(ScriptRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        endpoint: row.get("endpoint")?,
        code: row.get("code")?,
        debug_code: row.get("debug_code")?,
        debug_enabled: row.get::<_, i64>("debug_enabled")? != 0,
        test_params: row.get("test_params")?,
        trigger_config: row.get("trigger_config")?,
        created_at: row.get::<_, i64>("created_at")?.unsigned_abs(),
    })
}

/// Decodes one service_accounts row.
fn account_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceAccount> {
    Ok(ServiceAccount {
        id: row.get("id")?,
        name: row.get("name")?,
        secret: row.get("secret")?,
        created_at: row.get::<_, i64>("created_at")?.unsigned_abs(),
    })
}

/// Clamps a u64 timestamp into SQLite's signed range.
fn stamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: ScriptStore
// ============================================================================

impl ScriptStore for SqliteStore {
    fn list(&self) -> Result<Vec<ScriptRecord>, StoreError> {
        let conn = self.lock()?;
        let mut statement = conn
            .prepare("SELECT * FROM scripts ORDER BY created_at, id")
            .map_err(backend)?;
        let rows = statement
            .query_map([], script_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(rows)
    }

    fn get(&self, id: &str) -> Result<Option<ScriptRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM scripts WHERE id = ?1",
            params![id],
            script_from_row,
        )
        .optional()
        .map_err(backend)
    }

    fn get_by_endpoint(&self, endpoint: &str) -> Result<Option<ScriptRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM scripts WHERE endpoint = ?1",
            params![endpoint],
            script_from_row,
        )
        .optional()
        .map_err(backend)
    }

    fn insert(&self, record: &ScriptRecord) -> Result<(), StoreError> {
        validate_endpoint(&record.endpoint)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scripts
                (id, name, endpoint, code, debug_code, debug_enabled,
                 test_params, trigger_config, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.name,
                record.endpoint,
                record.code,
                record.debug_code,
                i64::from(record.debug_enabled),
                record.test_params,
                record.trigger_config,
                stamp(record.created_at),
            ],
        )
        .map_err(|err| write_error(err, &record.endpoint))?;
        Ok(())
    }

    fn update(&self, record: &ScriptRecord) -> Result<(), StoreError> {
        validate_endpoint(&record.endpoint)?;
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE scripts SET
                    name = ?2, endpoint = ?3, code = ?4, debug_code = ?5,
                    debug_enabled = ?6, test_params = ?7, trigger_config = ?8
                 WHERE id = ?1",
                params![
                    record.id,
                    record.name,
                    record.endpoint,
                    record.code,
                    record.debug_code,
                    i64::from(record.debug_enabled),
                    record.test_params,
                    record.trigger_config,
                ],
            )
            .map_err(|err| write_error(err, &record.endpoint))?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn update_debug(
        &self,
        id: &str,
        debug_code: Option<String>,
        debug_enabled: Option<bool>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE scripts SET
                    debug_code = COALESCE(?2, debug_code),
                    debug_enabled = COALESCE(?3, debug_enabled)
                 WHERE id = ?1",
                params![id, debug_code, debug_enabled.map(i64::from)],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM scripts WHERE id = ?1", params![id])
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: ServiceAccountStore
// ============================================================================

impl ServiceAccountStore for SqliteStore {
    fn list_accounts(&self) -> Result<Vec<ServiceAccount>, StoreError> {
        let conn = self.lock()?;
        let mut statement = conn
            .prepare("SELECT * FROM service_accounts ORDER BY created_at, id")
            .map_err(backend)?;
        let rows = statement
            .query_map([], account_from_row)
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(rows)
    }

    fn find_account(&self, id: &str) -> Result<Option<ServiceAccount>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM service_accounts WHERE id = ?1",
            params![id],
            account_from_row,
        )
        .optional()
        .map_err(backend)
    }

    fn insert_account(&self, account: &ServiceAccount) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO service_accounts (id, name, secret, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.id,
                account.name,
                account.secret,
                stamp(account.created_at),
            ],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn delete_account(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM service_accounts WHERE id = ?1", params![id])
            .map_err(backend)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: DebugAccessStore
// ============================================================================

impl DebugAccessStore for SqliteStore {
    fn debug_access(&self) -> Result<DebugAccessSettings, StoreError> {
        let conn = self.lock()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT enabled, allowed_cidrs FROM debug_access WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend)?;
        let Some((enabled, cidrs)) = row else {
            return Ok(DebugAccessSettings::default());
        };
        let allowed_cidrs: Vec<String> = serde_json::from_str(&cidrs)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(DebugAccessSettings {
            enabled: enabled != 0,
            allowed_cidrs,
        })
    }

    fn set_debug_access(&self, settings: &DebugAccessSettings) -> Result<(), StoreError> {
        let cidrs = serde_json::to_string(&settings.allowed_cidrs)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO debug_access (id, enabled, allowed_cidrs)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET enabled = ?1, allowed_cidrs = ?2",
            params![i64::from(settings.enabled), cidrs],
        )
        .map_err(backend)?;
        Ok(())
    }
}
