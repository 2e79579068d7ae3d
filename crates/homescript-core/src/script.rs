// homescript-core/src/script.rs
// ============================================================================
// Module: Script Records and Stores
// Description: Script, service-account, and debug-access persistence traits.
// Purpose: Define the storage contract plus an in-memory implementation.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A script is identified by a stable id and a unique URL-safe endpoint.
//! The store traits here are the only persistence surface the rest of the
//! system sees; the SQLite crate provides the durable implementation and
//! [`InMemoryStore`] backs tests and mock deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::trace::now_ms;

// ============================================================================
// SECTION: Records
// ============================================================================

/// One stored automation script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique URL-safe endpoint, charset `[a-z0-9-]`.
    pub endpoint: String,
    /// Main source text.
    pub code: String,
    /// Debug draft source, when any.
    pub debug_code: Option<String>,
    /// Whether the debug draft is enabled.
    pub debug_enabled: bool,
    /// Parameter-test JSON, when any.
    pub test_params: Option<String>,
    /// Serialized trigger config, when any.
    pub trigger_config: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl ScriptRecord {
    /// Returns the source the debug path should execute: the draft when
    /// enabled, otherwise the main code.
    #[must_use]
    pub fn effective_debug_code(&self) -> &str {
        if self.debug_enabled {
            self.debug_code.as_deref().unwrap_or(&self.code)
        } else {
            &self.code
        }
    }
}

/// One service account usable as a credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Stable identifier, presented as the service id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Shared secret.
    pub secret: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Debug-access settings for the LAN debugging path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugAccessSettings {
    /// Whether the bypass path is enabled at all.
    pub enabled: bool,
    /// CIDR blocks allowed to use the bypass.
    pub allowed_cidrs: Vec<String>,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates the endpoint charset: non-empty `[a-z0-9-]`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidEndpoint`] on violation.
pub fn validate_endpoint(endpoint: &str) -> Result<(), StoreError> {
    if endpoint.is_empty()
        || !endpoint
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found")]
    NotFound,
    /// The endpoint is already taken by another script.
    #[error("endpoint '{0}' is already in use")]
    EndpointConflict(String),
    /// The endpoint violates the `[a-z0-9-]` charset.
    #[error("endpoint '{0}' contains invalid characters")]
    InvalidEndpoint(String),
    /// The backing store failed.
    #[error("storage failure: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Store Traits
// ============================================================================

/// Script persistence surface.
pub trait ScriptStore: Send + Sync {
    /// Lists all scripts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list(&self) -> Result<Vec<ScriptRecord>, StoreError>;

    /// Fetches a script by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, id: &str) -> Result<Option<ScriptRecord>, StoreError>;

    /// Fetches a script by endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get_by_endpoint(&self, endpoint: &str) -> Result<Option<ScriptRecord>, StoreError>;

    /// Inserts a new script.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EndpointConflict`] when the endpoint is taken.
    fn insert(&self, record: &ScriptRecord) -> Result<(), StoreError>;

    /// Updates an existing script in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id does not exist.
    fn update(&self, record: &ScriptRecord) -> Result<(), StoreError>;

    /// Partially updates the debug draft and/or debug flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id does not exist.
    fn update_debug(
        &self,
        id: &str,
        debug_code: Option<String>,
        debug_enabled: Option<bool>,
    ) -> Result<(), StoreError>;

    /// Deletes a script.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id does not exist.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Service-account persistence surface.
pub trait ServiceAccountStore: Send + Sync {
    /// Lists all accounts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_accounts(&self) -> Result<Vec<ServiceAccount>, StoreError>;

    /// Fetches an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn find_account(&self, id: &str) -> Result<Option<ServiceAccount>, StoreError>;

    /// Inserts a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_account(&self, account: &ServiceAccount) -> Result<(), StoreError>;

    /// Deletes an account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id does not exist.
    fn delete_account(&self, id: &str) -> Result<(), StoreError>;
}

/// Debug-access settings persistence surface.
pub trait DebugAccessStore: Send + Sync {
    /// Reads the current settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn debug_access(&self) -> Result<DebugAccessSettings, StoreError>;

    /// Replaces the settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn set_debug_access(&self, settings: &DebugAccessSettings) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Process-local store for tests and mock deployments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Stored scripts.
    scripts: RwLock<Vec<ScriptRecord>>,
    /// Stored accounts.
    accounts: RwLock<Vec<ServiceAccount>>,
    /// Debug-access settings.
    debug_access: RwLock<DebugAccessSettings>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one script bound to `endpoint`.
    #[must_use]
    pub fn with_script(endpoint: &str, code: &str) -> Self {
        let store = Self::new();
        let record = ScriptRecord {
            id: endpoint.to_string(),
            name: endpoint.to_string(),
            endpoint: endpoint.to_string(),
            code: code.to_string(),
            debug_code: None,
            debug_enabled: false,
            test_params: None,
            trigger_config: None,
            created_at: now_ms(),
        };
        if let Ok(mut scripts) = store.scripts.write() {
            scripts.push(record);
        }
        store
    }
}

/// Converts a poisoned-lock failure into a backend error.
fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

impl ScriptStore for InMemoryStore {
    fn list(&self) -> Result<Vec<ScriptRecord>, StoreError> {
        Ok(self.scripts.read().map_err(|_| poisoned())?.clone())
    }

    fn get(&self, id: &str) -> Result<Option<ScriptRecord>, StoreError> {
        Ok(self
            .scripts
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    fn get_by_endpoint(&self, endpoint: &str) -> Result<Option<ScriptRecord>, StoreError> {
        Ok(self
            .scripts
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .find(|record| record.endpoint == endpoint)
            .cloned())
    }

    fn insert(&self, record: &ScriptRecord) -> Result<(), StoreError> {
        validate_endpoint(&record.endpoint)?;
        let mut scripts = self.scripts.write().map_err(|_| poisoned())?;
        if scripts.iter().any(|existing| existing.endpoint == record.endpoint) {
            return Err(StoreError::EndpointConflict(record.endpoint.clone()));
        }
        scripts.push(record.clone());
        Ok(())
    }

    fn update(&self, record: &ScriptRecord) -> Result<(), StoreError> {
        validate_endpoint(&record.endpoint)?;
        let mut scripts = self.scripts.write().map_err(|_| poisoned())?;
        if scripts
            .iter()
            .any(|existing| existing.endpoint == record.endpoint && existing.id != record.id)
        {
            return Err(StoreError::EndpointConflict(record.endpoint.clone()));
        }
        let Some(existing) = scripts.iter_mut().find(|existing| existing.id == record.id)
        else {
            return Err(StoreError::NotFound);
        };
        *existing = record.clone();
        Ok(())
    }

    fn update_debug(
        &self,
        id: &str,
        debug_code: Option<String>,
        debug_enabled: Option<bool>,
    ) -> Result<(), StoreError> {
        let mut scripts = self.scripts.write().map_err(|_| poisoned())?;
        let Some(existing) = scripts.iter_mut().find(|existing| existing.id == id) else {
            return Err(StoreError::NotFound);
        };
        if let Some(code) = debug_code {
            existing.debug_code = Some(code);
        }
        if let Some(enabled) = debug_enabled {
            existing.debug_enabled = enabled;
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut scripts = self.scripts.write().map_err(|_| poisoned())?;
        let before = scripts.len();
        scripts.retain(|record| record.id != id);
        if scripts.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl ServiceAccountStore for InMemoryStore {
    fn list_accounts(&self) -> Result<Vec<ServiceAccount>, StoreError> {
        Ok(self.accounts.read().map_err(|_| poisoned())?.clone())
    }

    fn find_account(&self, id: &str) -> Result<Option<ServiceAccount>, StoreError> {
        Ok(self
            .accounts
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .find(|account| account.id == id)
            .cloned())
    }

    fn insert_account(&self, account: &ServiceAccount) -> Result<(), StoreError> {
        self.accounts
            .write()
            .map_err(|_| poisoned())?
            .push(account.clone());
        Ok(())
    }

    fn delete_account(&self, id: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        let before = accounts.len();
        accounts.retain(|account| account.id != id);
        if accounts.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl DebugAccessStore for InMemoryStore {
    fn debug_access(&self) -> Result<DebugAccessSettings, StoreError> {
        Ok(self.debug_access.read().map_err(|_| poisoned())?.clone())
    }

    fn set_debug_access(&self, settings: &DebugAccessSettings) -> Result<(), StoreError> {
        *self.debug_access.write().map_err(|_| poisoned())? = settings.clone();
        Ok(())
    }
}
