// crates/rce-config/src/config.rs
// ============================================================================
// Module: Platform Configuration
// Description: Configuration loading and validation for the compliance
// scanning platform.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rce-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid configuration fails closed.

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

const DEFAULT_CONFIG_NAME: &str = "rce.toml";
pub(crate) const CONFIG_ENV_VAR: &str = "RCE_CONFIG";
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
const DEFAULT_TOKEN_TTL_SECS: i64 = 120;
const DEFAULT_SYNC_POLL_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RceConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub rulesource: RuleSourceConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RceConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then `RCE_CONFIG`, then `rce.toml` in the working
    /// directory.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.object_store.validate()?;
        self.license.validate()?;
        self.rulesource.validate()?;
        self.trigger.validate()?;
        Ok(())
    }
}

/// `rce-store-sqlite` connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// # Errors
    /// Returns [`ConfigError`] when `path` is empty or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path)
    }
}

fn default_store_path() -> String {
    "rce-store.sqlite3".to_string()
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Supported object-store providers for sharded scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreProvider {
    S3,
    Memory,
}

impl Default for ObjectStoreProvider {
    fn default() -> Self {
        Self::Memory
    }
}

/// Object-store configuration for sharded scan results (spec.md §3 shard
/// storage).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default)]
    pub provider: ObjectStoreProvider,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

impl ObjectStoreConfig {
    /// # Errors
    /// Returns [`ConfigError`] when the S3 provider is selected without a
    /// bucket, or `endpoint` is malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == ObjectStoreProvider::S3 {
            let bucket = self.bucket.as_deref().unwrap_or("").trim();
            if bucket.is_empty() {
                return Err(ConfigError::Invalid("object_store.bucket must be set for provider s3".to_string()));
            }
        }
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid("object_store.endpoint must include http:// or https://".to_string()));
            }
            if trimmed.starts_with("http://") && !self.allow_http {
                return Err(ConfigError::Invalid("object_store.endpoint uses http:// without allow_http".to_string()));
            }
        }
        Ok(())
    }
}

/// License Client configuration (spec.md §4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    /// Secret-store handle naming the HMAC signing key.
    #[serde(default = "default_signing_key_handle")]
    pub signing_key_handle: String,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token_ttl_secs: default_token_ttl_secs(),
            signing_key_handle: default_signing_key_handle(),
        }
    }
}

impl LicenseConfig {
    /// # Errors
    /// Returns [`ConfigError`] when `token_ttl_secs` is non-positive, or
    /// `base_url` is set but malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("license.token_ttl_secs must be positive".to_string()));
        }
        if let Some(url) = &self.base_url {
            validate_url("license.base_url", url)?;
        }
        Ok(())
    }
}

const fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_signing_key_handle() -> String {
    "license-manager-signing-key".to_string()
}

/// Rule-Source Syncer configuration (spec.md §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSourceConfig {
    #[serde(default = "default_sync_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Secret-store handle prefix used when a source needs a PAT/deploy key.
    #[serde(default = "default_secret_handle_prefix")]
    pub secret_handle_prefix: String,
}

impl Default for RuleSourceConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_sync_poll_interval_secs(),
            secret_handle_prefix: default_secret_handle_prefix(),
        }
    }
}

impl RuleSourceConfig {
    /// # Errors
    /// Returns [`ConfigError`] when `poll_interval_secs` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("rulesource.poll_interval_secs must be non-zero".to_string()));
        }
        Ok(())
    }
}

const fn default_sync_poll_interval_secs() -> u64 {
    DEFAULT_SYNC_POLL_INTERVAL_SECS
}

fn default_secret_handle_prefix() -> String {
    "rule-source-token/".to_string()
}

/// Scheduled & Event-Driven Trigger Layer configuration (spec.md §4.4).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub scheduler_base_url: Option<String>,
    #[serde(default)]
    pub event_bus_name: Option<String>,
}

impl TriggerConfig {
    /// # Errors
    /// Returns [`ConfigError`] when `scheduler_base_url` is set but
    /// malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.scheduler_base_url {
            validate_url("trigger.scheduler_base_url", url)?;
        }
        Ok(())
    }
}

/// Logging configuration for `tracing-subscriber` initialization.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ConfigError::Invalid(format!("{field} must include http:// or https://")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = RceConfig {
            store: StoreConfig::default(),
            object_store: ObjectStoreConfig::default(),
            license: LicenseConfig::default(),
            rulesource: RuleSourceConfig::default(),
            trigger: TriggerConfig::default(),
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn s3_provider_without_bucket_is_rejected() {
        let object_store = ObjectStoreConfig {
            provider: ObjectStoreProvider::S3,
            ..ObjectStoreConfig::default()
        };
        assert!(object_store.validate().is_err());
    }

    #[test]
    fn http_endpoint_without_allow_http_is_rejected() {
        let object_store = ObjectStoreConfig {
            provider: ObjectStoreProvider::S3,
            bucket: Some("scan-results".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            ..ObjectStoreConfig::default()
        };
        assert!(object_store.validate().is_err());
    }

    #[test]
    fn load_reads_toml_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rce.toml");
        fs::write(
            &path,
            r#"
            [store]
            path = "scans.sqlite3"

            [object_store]
            provider = "s3"
            bucket = "scan-results"
            "#,
        )
        .expect("write config");
        let config = RceConfig::load(Some(&path)).expect("load");
        assert_eq!(config.store.path, "scans.sqlite3");
        assert_eq!(config.object_store.bucket.as_deref(), Some("scan-results"));
    }

    #[test]
    fn load_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rce.toml");
        fs::write(&path, "a".repeat(MAX_CONFIG_FILE_SIZE + 1)).expect("write config");
        assert!(matches!(RceConfig::load(Some(&path)), Err(ConfigError::Invalid(_))));
    }
}
