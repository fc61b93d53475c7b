// crates/rce-trigger/src/error.rs
// ============================================================================
// Module: Trigger Layer Errors
// Description: RegisterJob/UpdateJob/DeregisterJob and event-router failure
// taxonomy, converging on rce_core::error::CoreError at the crate boundary.
// Purpose: spec.md §4.4, §7 error taxonomy.
// Dependencies: rce-core, thiserror
// ============================================================================

use rce_core::error::CoreError;
use rce_core::interfaces::SchedulerError;
use rce_store_sqlite::SqliteStoreError;
use thiserror::Error;

use crate::cron::CronSyntaxError;

/// Errors raised by the cron scheduler and event router.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The cron expression failed local syntax validation or was rejected
    /// by the external scheduler.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    /// `ScheduledJob` not found for update/deregister.
    #[error("scheduled job not found: {0}")]
    NotFound(String),
    /// The external scheduler backend failed.
    #[error("external scheduler error: {0}")]
    Scheduler(String),
    /// A persistence operation failed.
    #[error("store error: {0}")]
    Store(String),
}

impl From<CronSyntaxError> for TriggerError {
    fn from(error: CronSyntaxError) -> Self {
        TriggerError::InvalidSchedule(error.0)
    }
}

impl From<SchedulerError> for TriggerError {
    fn from(error: SchedulerError) -> Self {
        match error {
            SchedulerError::InvalidSchedule(message) => TriggerError::InvalidSchedule(message),
            SchedulerError::Backend(message) => TriggerError::Scheduler(message),
        }
    }
}

impl From<SqliteStoreError> for TriggerError {
    fn from(error: SqliteStoreError) -> Self {
        TriggerError::Store(error.to_string())
    }
}

impl From<TriggerError> for CoreError {
    fn from(error: TriggerError) -> Self {
        match error {
            TriggerError::InvalidSchedule(message) => CoreError::invalid_input(message),
            TriggerError::NotFound(message) => CoreError::not_found(message),
            TriggerError::Scheduler(message) => CoreError::upstream_unavailable(message),
            TriggerError::Store(message) => CoreError::internal(message),
        }
    }
}
