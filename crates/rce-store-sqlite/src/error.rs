// crates/rce-store-sqlite/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: SqliteStoreError and its conversion into the workspace-wide
// CoreError taxonomy.
// Purpose: spec.md §7 error taxonomy at the persistence boundary.
// Dependencies: rce-core, thiserror
// ============================================================================

use rce_core::error::CoreError;
use thiserror::Error;

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    #[error("sqlite store io error: {0}")]
    Io(String),
    #[error("sqlite store db error: {0}")]
    Db(String),
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    #[error("sqlite store record not found: {0}")]
    NotFound(String),
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for CoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(message) => CoreError::not_found(message),
            SqliteStoreError::Conflict(message) => CoreError::conflict(message),
            SqliteStoreError::Invalid(message) => CoreError::invalid_input(message),
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => {
                CoreError::upstream_unavailable(message)
            }
        }
    }
}
