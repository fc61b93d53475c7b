// crates/rce-core/src/error.rs
// ============================================================================
// Module: Core Error Taxonomy
// Description: Workspace-wide error kind and the core error type crates
// converge on at their public boundary.
// Purpose: Implement the error taxonomy of spec.md §7.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ErrorKind`] names the recovery/surface semantics of spec.md §7's table.
//! [`CoreError`] pairs a kind with a message and is the type every crate's
//! local error converts into at its public API boundary, mirroring the
//! teacher's `SqliteStoreError -> StoreError` conversion pattern.

use thiserror::Error;

/// Recovery/surface classification from spec.md §7.
///
/// # Invariants
/// - Variants are stable for programmatic handling and HTTP surface mapping
///   performed by the (out-of-scope) REST collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reject; no recovery. Surfaced as 400/422 by the REST collaborator.
    InvalidInput,
    /// Entity not found. Surfaced as 404.
    NotFound,
    /// Conflicting state change. Surfaced as 409.
    Conflict,
    /// Caller is not permitted to perform the action. Surfaced as 403.
    Forbidden,
    /// No applicable license is linked to the tenant. Surfaced as 403.
    NoLicense,
    /// License allowance exhausted or denied by the License Manager. Surfaced as 403.
    QuotaExceeded,
    /// Upstream collaborator (License Manager, git host, worker runtime) is
    /// unavailable. Retry with backoff where applicable; surfaced as 503 or
    /// degraded for best-effort paths.
    UpstreamUnavailable,
    /// Transient storage failure; retry up to N times.
    StorageTransient,
    /// An individual element failed to encode/decode; skip it and log.
    EncodeDecode,
    /// Unclassified internal failure; fail closed. Surfaced as 500.
    Internal,
}

impl ErrorKind {
    /// Returns the conventional HTTP status the REST collaborator should use.
    ///
    /// `rce-core` has no HTTP surface of its own; this mapping exists so
    /// collaborators built against this crate do not have to re-derive the
    /// spec.md §7 table.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 422,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Forbidden | Self::NoLicense | Self::QuotaExceeded => 403,
            Self::UpstreamUnavailable => 503,
            Self::StorageTransient | Self::EncodeDecode | Self::Internal => 500,
        }
    }

    /// Returns true when the failure is safe to retry with backoff.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::UpstreamUnavailable | Self::StorageTransient)
    }
}

/// Workspace-wide core error.
///
/// # Invariants
/// - `kind` drives recovery and surface behavior; `message` is diagnostic
///   only and must not be parsed by callers.
#[derive(Debug, Error, Clone)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable diagnostic message.
    pub message: String,
}

impl CoreError {
    /// Builds a new core error from a kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for [`ErrorKind::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for [`ErrorKind::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Shorthand for [`ErrorKind::NoLicense`].
    pub fn no_license(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoLicense, message)
    }

    /// Shorthand for [`ErrorKind::QuotaExceeded`].
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }

    /// Shorthand for [`ErrorKind::UpstreamUnavailable`].
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}
