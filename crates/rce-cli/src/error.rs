// crates/rce-cli/src/error.rs
// ============================================================================
// Module: CLI Error
// Description: Top-level error type the command dispatcher converges on.
// Purpose: Uniform error reporting across every `rce` subcommand.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] rce_config::ConfigError),
    #[error("store error: {0}")]
    Store(#[from] rce_store_sqlite::SqliteStoreError),
    #[error("object store error: {0}")]
    ObjectStore(#[from] rce_core::interfaces::ObjectStoreError),
    #[error("sync error: {0}")]
    Sync(#[from] rce_rulesource::SyncError),
    #[error("report error: {0}")]
    Reports(#[from] rce_reports::ReportsError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
