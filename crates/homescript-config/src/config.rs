// homescript-config/src/config.rs
// ============================================================================
// Module: HomeScript Configuration
// Description: Configuration loading and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ipnet, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration comes from a TOML file (path via `HOMESCRIPT_CONFIG`,
//! default `homescript.toml`, optional) merged with environment variables;
//! the environment wins. Validation enforces size, count, and range limits
//! before anything boots.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use ipnet::IpNet;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "homescript.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "HOMESCRIPT_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum number of API tokens.
const MAX_API_TOKENS: usize = 64;
/// Maximum length of a single API token.
const MAX_API_TOKEN_LENGTH: usize = 256;
/// Minimum outbound deadline in milliseconds.
const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum outbound deadline in milliseconds.
const MAX_TIMEOUT_MS: u64 = 120_000;
/// Default outbound deadline in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 8_000;
/// Default HTTP port.
const DEFAULT_PORT: u16 = 3000;
/// Minimum rate-limit window in milliseconds.
const MIN_RATE_WINDOW_MS: u64 = 100;
/// Maximum rate-limit window in milliseconds.
const MAX_RATE_WINDOW_MS: u64 = 60_000;
/// Maximum requests per rate-limit window.
const MAX_RATE_REQUESTS: u32 = 100_000;
/// Maximum tracked rate-limit entries.
const MAX_RATE_ENTRIES: usize = 65_536;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path}: {reason}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// OS-level reason.
        reason: String,
    },
    /// The file exceeds the size limit.
    #[error("config file {path} exceeds {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge {
        /// Offending path.
        path: PathBuf,
    },
    /// The TOML could not be parsed.
    #[error("invalid config file: {0}")]
    Parse(String),
    /// A field failed validation.
    #[error("invalid config: {field}: {reason}")]
    Invalid {
        /// Field path.
        field: &'static str,
        /// Violation description.
        reason: String,
    },
}

/// Shorthand for a validation failure.
fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: String,
    /// Listen port.
    pub port: u16,
    /// Bearer tokens accepted on the admin surface.
    pub api_tokens: Vec<String>,
    /// Session secret, consumed by the session middleware layer.
    pub session_secret: Option<String>,
    /// SSO provider base URL, consumed by the SSO layer.
    pub authentik_url: Option<String>,
    /// SSO client id, consumed by the SSO layer.
    pub authentik_client_id: Option<String>,
    /// SSO client secret, consumed by the SSO layer.
    pub authentik_client_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            api_tokens: Vec::new(),
            session_secret: None,
            authentik_url: None,
            authentik_client_id: None,
            authentik_client_secret: None,
        }
    }
}

/// Home Assistant connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HaSection {
    /// Base URL, required for live mode.
    pub url: Option<String>,
    /// Long-lived access token, required for live mode.
    pub token: Option<String>,
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
    /// When true, never touch a live endpoint.
    pub mock: bool,
}

impl Default for HaSection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            mock: true,
        }
    }
}

impl HaSection {
    /// Returns true when live credentials are configured and mock is off.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.mock && self.url.is_some() && self.token.is_some()
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("homescript.db"),
        }
    }
}

/// LAN debug-access settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugAccessConfig {
    /// Whether the bypass path is enabled at all.
    pub enabled: bool,
    /// CIDR blocks allowed to use the bypass.
    pub allowed_cidrs: Vec<String>,
}

/// Fixed-window rate-limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSection {
    /// Whether limiting is enforced.
    pub enabled: bool,
    /// Requests allowed per window per caller/endpoint.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Maximum tracked caller/endpoint entries.
    pub max_entries: usize,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 60,
            window_ms: 60_000,
            max_entries: 4_096,
        }
    }
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomescriptConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Home Assistant settings.
    pub home_assistant: HaSection,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Debug-access settings.
    pub debug_access: DebugAccessConfig,
    /// Rate-limit settings.
    pub rate_limit: RateLimitSection,
}

impl HomescriptConfig {
    /// Loads config from disk and the environment, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on unreadable/oversized files, parse
    /// failures, or validation failures.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit_env = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
        let resolved = path
            .map(Path::to_path_buf)
            .or(explicit_env)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME));

        let mut config = if resolved.exists() {
            Self::load_file(&resolved)?
        } else if path.is_some() {
            // An explicitly named file must exist.
            return Err(ConfigError::Io {
                path: resolved,
                reason: "file not found".to_string(),
            });
        } else {
            Self::default()
        };

        config.apply_env_from(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file with the size limit enforced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O, size, or parse failures.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides through a lookup function.
    ///
    /// Recognized: `HA_URL`, `HA_TOKEN`, `HA_TIMEOUT_MS`, `MOCK`, `PORT`,
    /// `JWT_SECRET`, `SESSION_SECRET`, `AUTHENTIK_URL`,
    /// `AUTHENTIK_CLIENT_ID`, `AUTHENTIK_CLIENT_SECRET`.
    pub fn apply_env_from<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("HA_URL") {
            self.home_assistant.url = Some(url);
        }
        if let Some(token) = get("HA_TOKEN") {
            self.home_assistant.token = Some(token);
        }
        if let Some(timeout) = get("HA_TIMEOUT_MS").and_then(|raw| raw.parse().ok()) {
            self.home_assistant.timeout_ms = timeout;
        }
        if let Some(mock) = get("MOCK") {
            self.home_assistant.mock = parse_bool(&mock);
        }
        if let Some(port) = get("PORT").and_then(|raw| raw.parse().ok()) {
            self.server.port = port;
        }
        if let Some(secret) = get("JWT_SECRET") {
            if !self.server.api_tokens.contains(&secret) {
                self.server.api_tokens.push(secret);
            }
        }
        if let Some(secret) = get("SESSION_SECRET") {
            self.server.session_secret = Some(secret);
        }
        if let Some(url) = get("AUTHENTIK_URL") {
            self.server.authentik_url = Some(url);
        }
        if let Some(id) = get("AUTHENTIK_CLIENT_ID") {
            self.server.authentik_client_id = Some(id);
        }
        if let Some(secret) = get("AUTHENTIK_CLIENT_SECRET") {
            self.server.authentik_client_secret = Some(secret);
        }
    }

    /// Validates all limits and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "port must be non-zero"));
        }
        if self.server.api_tokens.len() > MAX_API_TOKENS {
            return Err(invalid(
                "server.api_tokens",
                format!("at most {MAX_API_TOKENS} tokens allowed"),
            ));
        }
        for token in &self.server.api_tokens {
            if token.is_empty() || token.len() > MAX_API_TOKEN_LENGTH {
                return Err(invalid(
                    "server.api_tokens",
                    format!("token length must be 1..={MAX_API_TOKEN_LENGTH}"),
                ));
            }
        }
        if let Some(url) = &self.home_assistant.url {
            let parsed = Url::parse(url)
                .map_err(|err| invalid("home_assistant.url", err.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(
                    "home_assistant.url",
                    "scheme must be http or https",
                ));
            }
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.home_assistant.timeout_ms) {
            return Err(invalid(
                "home_assistant.timeout_ms",
                format!("must be within {MIN_TIMEOUT_MS}..={MAX_TIMEOUT_MS}"),
            ));
        }
        if !self.home_assistant.mock
            && (self.home_assistant.url.is_none() || self.home_assistant.token.is_none())
        {
            return Err(invalid(
                "home_assistant",
                "live mode requires both url and token",
            ));
        }
        for cidr in &self.debug_access.allowed_cidrs {
            cidr.parse::<IpNet>()
                .map_err(|err| invalid("debug_access.allowed_cidrs", format!("{cidr}: {err}")))?;
        }
        if self.rate_limit.enabled {
            if !(MIN_RATE_WINDOW_MS..=MAX_RATE_WINDOW_MS).contains(&self.rate_limit.window_ms) {
                return Err(invalid(
                    "rate_limit.window_ms",
                    format!("must be within {MIN_RATE_WINDOW_MS}..={MAX_RATE_WINDOW_MS}"),
                ));
            }
            if self.rate_limit.max_requests == 0
                || self.rate_limit.max_requests > MAX_RATE_REQUESTS
            {
                return Err(invalid(
                    "rate_limit.max_requests",
                    format!("must be within 1..={MAX_RATE_REQUESTS}"),
                ));
            }
            if self.rate_limit.max_entries == 0 || self.rate_limit.max_entries > MAX_RATE_ENTRIES {
                return Err(invalid(
                    "rate_limit.max_entries",
                    format!("must be within 1..={MAX_RATE_ENTRIES}"),
                ));
            }
        }
        Ok(())
    }
}

/// Parses a permissive boolean: `1`, `true`, `yes`, `on` (any case).
fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
