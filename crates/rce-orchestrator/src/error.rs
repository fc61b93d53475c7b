// crates/rce-orchestrator/src/error.rs
// ============================================================================
// Module: Orchestrator Errors
// Description: SubmitJob/UpdateJobFromWorker failure taxonomy, converging
// on rce_core::error::CoreError at the crate boundary.
// Purpose: spec.md §4.1 admission failures, §7 error taxonomy.
// Dependencies: rce-core, rce-license, rce-store-sqlite, thiserror
// ============================================================================

use rce_core::error::CoreError;
use rce_core::interfaces::EngineError;
use rce_core::interfaces::ObjectStoreError;
use rce_license::client::LicenseClientError;
use rce_store_sqlite::SqliteStoreError;
use thiserror::Error;

/// Errors raised while admitting or updating a Job.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No applicable license is linked to the tenant (spec.md §4.1).
    #[error("no license for tenant")]
    NoLicense,
    /// The requested (or license-implied) ruleset expansion is empty.
    #[error("no rulesets resolved for job")]
    InvalidRulesets,
    /// `CheckPermission` denied, or `PostJob` returned 403.
    #[error("license quota exceeded")]
    QuotaExceeded,
    /// `PostJob` returned 404.
    #[error("invalid data rejected by license manager: {0}")]
    InvalidData(String),
    /// License Manager unreachable during admission (fails `SubmitJob`).
    #[error("license manager unavailable: {0}")]
    UpstreamUnavailable(String),
    /// Worker runtime rejected or could not accept dispatch.
    #[error("worker dispatch failed: {0}")]
    Dispatch(String),
    #[error("store error: {0}")]
    Store(#[from] SqliteStoreError),
    /// Flushing a completed job's scan results to the shard store failed.
    #[error("shard store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),
}

impl From<OrchestratorError> for CoreError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::NoLicense => CoreError::no_license(error.to_string()),
            OrchestratorError::InvalidRulesets | OrchestratorError::InvalidData(_) => CoreError::invalid_input(error.to_string()),
            OrchestratorError::QuotaExceeded => CoreError::quota_exceeded(error.to_string()),
            OrchestratorError::UpstreamUnavailable(_) | OrchestratorError::Dispatch(_) => CoreError::upstream_unavailable(error.to_string()),
            OrchestratorError::Store(err) => err.into(),
            OrchestratorError::ObjectStore(err) => CoreError::internal(err.to_string()),
        }
    }
}

/// Maps a `LicenseClient::check_permission`/`post_job` failure onto
/// `SubmitJob`'s admission error taxonomy (spec.md §4.1: "`403` ->
/// `QUOTA_EXCEEDED`, `404` -> `INVALID_DATA`, unavailable ->
/// `UPSTREAM_UNAVAILABLE`").
pub(crate) fn map_license_error(error: LicenseClientError) -> OrchestratorError {
    use rce_core::interfaces::LicenseTransportError as T;
    match error {
        LicenseClientError::Transport(T::Forbidden) => OrchestratorError::QuotaExceeded,
        LicenseClientError::Transport(T::NotFound) => OrchestratorError::InvalidData("license manager returned not found".to_string()),
        LicenseClientError::Transport(T::InvalidData(message)) => OrchestratorError::InvalidData(message),
        LicenseClientError::Transport(T::Unavailable(message)) => OrchestratorError::UpstreamUnavailable(message),
        LicenseClientError::NoLicense => OrchestratorError::NoLicense,
        other => OrchestratorError::UpstreamUnavailable(other.to_string()),
    }
}

pub(crate) fn map_engine_error(error: EngineError) -> OrchestratorError {
    OrchestratorError::Dispatch(error.to_string())
}
