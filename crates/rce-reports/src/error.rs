// crates/rce-reports/src/error.rs
// ============================================================================
// Module: Report Errors
// Description: Failure taxonomy for report derivation.
// Purpose: spec.md §4.3, §7 error taxonomy.
// Dependencies: rce-core, thiserror
// ============================================================================

use rce_core::error::CoreError;
use rce_core::interfaces::MetadataRegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportsError {
    #[error("metadata: {0}")]
    Metadata(#[from] MetadataRegistryError),
    #[error("malformed resource: {0}")]
    MalformedResource(String),
    #[error("no standard named {0}")]
    UnknownStandard(String),
}

impl From<ReportsError> for CoreError {
    fn from(error: ReportsError) -> Self {
        match error {
            ReportsError::Metadata(_) | ReportsError::UnknownStandard(_) => CoreError::not_found(error.to_string()),
            ReportsError::MalformedResource(_) => CoreError::invalid_input(error.to_string()),
        }
    }
}
