// crates/rce-config/src/lib.rs
// ============================================================================
// Crate: rce-config
// Description: Canonical configuration model, loading, and validation.
// Purpose: Single source of truth for rce.toml semantics.
// Dependencies: serde, toml
// ============================================================================

pub mod config;

pub use config::ConfigError;
pub use config::LicenseConfig;
pub use config::LoggingConfig;
pub use config::ObjectStoreConfig;
pub use config::ObjectStoreProvider;
pub use config::RceConfig;
pub use config::RuleSourceConfig;
pub use config::StoreConfig;
pub use config::TriggerConfig;
