// crates/rce-core/src/model/rule_source.rs
// ============================================================================
// Module: RuleSource
// Description: Git-origin bundle defining a rule catalog.
// Purpose: Canonical type for spec.md §3 RuleSource, §4.6 sync lifecycle.
// Dependencies: crate::identifiers, chrono, serde
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::RuleSourceId;

/// Git host backing a rule-source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleSourceType {
    Gitlab,
    Github,
    GithubRelease,
}

/// Outcome of the most recent sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    Synced,
    Failed,
    /// A sync is currently in flight; no prior attempt has resolved it.
    Syncing,
}

/// Descriptor of the latest sync attempt for a rule-source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestSync {
    pub status: SyncStatus,
    pub release_tag: Option<String>,
    pub version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A git-origin bundle of rules.
///
/// # Invariants
/// - `id` is deterministically derived from `(customer, url, project_id,
///   git_ref, prefix)`; see [`RuleSourceId::derive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSource {
    pub id: RuleSourceId,
    pub customer_id: CustomerId,
    pub url: String,
    pub project_id: String,
    pub git_ref: String,
    pub prefix: Option<String>,
    pub source_type: RuleSourceType,
    pub latest_sync: Option<LatestSync>,
    pub description: Option<String>,
    /// Handle into the secret store (personal access token, deploy key, …).
    pub secret_handle: Option<String>,
}

impl RuleSource {
    /// Re-derives this rule-source's identity for invariant checks.
    #[must_use]
    pub fn expected_id(&self) -> RuleSourceId {
        RuleSourceId::derive(
            &self.customer_id,
            &self.url,
            &self.project_id,
            &self.git_ref,
            self.prefix.as_deref(),
        )
    }
}
