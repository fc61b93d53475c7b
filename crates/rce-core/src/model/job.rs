// crates/rce-core/src/model/job.rs
// ============================================================================
// Module: Job
// Description: A single scan execution and its lifecycle state machine.
// Purpose: Canonical type for spec.md §3 Job, §4.1 state machine.
// Dependencies: crate::identifiers, chrono, std::collections::BTreeMap, serde
// ============================================================================

//! ## Overview
//! `JobStatus` carries an explicit rank so transitions can be checked for
//! monotonicity without re-deriving an ordering from declaration order.
//! Backwards transitions are a no-op, not an error: the orchestrator is
//! expected to call [`JobStatus::advance`] and ignore a `None` result rather
//! than treat a stale worker report as a failure.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::identifiers::CelerySlotId;
use crate::identifiers::CustomerId;
use crate::identifiers::JobId;
use crate::identifiers::LicenseKey;
use crate::identifiers::RulesetName;
use crate::identifiers::TenantId;

/// Job lifecycle status.
///
/// # Invariants
/// - `Succeeded` and `Failed` are terminal: no further transition is valid.
/// - Rank is monotonically non-decreasing across the lifetime of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Rank used to detect and reject backwards transitions. `Succeeded`
    /// and `Failed` share the terminal rank: once either is reached no
    /// further transition (including between the two) is accepted.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Pending => 1,
            Self::Runnable => 2,
            Self::Starting => 3,
            Self::Running => 4,
            Self::Succeeded | Self::Failed => 5,
        }
    }

    /// True for `Succeeded` or `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.rank() == 5
    }

    /// Applies a reported status, returning the new status if it advances
    /// the state machine, or `None` if `next` would move rank backwards (in
    /// which case the caller keeps `self`).
    #[must_use]
    pub fn advance(self, next: Self) -> Option<Self> {
        if self.is_terminal() {
            return None;
        }
        if next.rank() < self.rank() {
            return None;
        }
        Some(next)
    }
}

/// Whether a job was submitted directly or by a recurring schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanType {
    Manual,
    Reactive,
}

/// Requested vs. licensed ruleset views for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetView {
    pub requested: Vec<RulesetName>,
    pub licensed: Vec<RulesetName>,
}

/// One scan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub owner: String,
    pub submitted_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub rulesets: RulesetView,
    pub target_regions: Vec<String>,
    pub scheduled_rule_name: Option<String>,
    pub scan_type: ScanType,
    pub license_keys: Vec<LicenseKey>,
    pub native_task_id: Option<CelerySlotId>,
    pub job_queue: Option<String>,
    pub job_definition: Option<String>,
}

impl Job {
    /// Builds a freshly submitted job with monotonic `submitted_at`.
    #[must_use]
    pub fn submit(
        tenant_id: TenantId,
        customer_id: CustomerId,
        owner: impl Into<String>,
        rulesets: RulesetView,
        target_regions: Vec<String>,
        scan_type: ScanType,
        license_keys: Vec<LicenseKey>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(Uuid::new_v4()),
            tenant_id,
            customer_id,
            owner: owner.into(),
            submitted_at,
            created_at: None,
            started_at: None,
            stopped_at: None,
            status: JobStatus::Submitted,
            rulesets,
            target_regions,
            scheduled_rule_name: None,
            scan_type,
            license_keys,
            native_task_id: None,
            job_queue: None,
            job_definition: None,
        }
    }

    /// Applies a worker status report, honoring monotonicity. Returns
    /// `true` when the status actually changed.
    pub fn apply_status(&mut self, reported: JobStatus) -> bool {
        match self.status.advance(reported) {
            Some(next) if next != self.status => {
                self.status = next;
                true
            }
            _ => false,
        }
    }

    /// Sets a field only if it is not already populated, per the
    /// idempotent-field-set contract of `UpdateJobFromWorker` (spec.md §4.1).
    pub fn set_created_at_if_absent(&mut self, value: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(value);
        }
    }

    /// See [`Job::set_created_at_if_absent`].
    pub fn set_started_at_if_absent(&mut self, value: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(value);
        }
    }

    /// See [`Job::set_created_at_if_absent`].
    pub fn set_stopped_at_if_absent(&mut self, value: DateTime<Utc>) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(value);
        }
    }

    /// True when this job has at least one attached license key.
    #[must_use]
    pub fn is_licensed(&self) -> bool {
        !self.license_keys.is_empty()
    }
}

/// Per-region rule-name targets for an event-driven `BatchResult`, keyed by
/// region. See [`crate::model::batch_result::BatchResult`].
pub type RegionRuleMap = BTreeMap<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_monotonically() {
        let mut status = JobStatus::Submitted;
        for next in [
            JobStatus::Pending,
            JobStatus::Runnable,
            JobStatus::Starting,
            JobStatus::Running,
            JobStatus::Succeeded,
        ] {
            status = status.advance(next).expect("forward transition accepted");
        }
        assert!(status.is_terminal());
    }

    #[test]
    fn terminal_status_rejects_further_transitions() {
        let status = JobStatus::Succeeded;
        assert_eq!(status.advance(JobStatus::Failed), None);
        assert_eq!(status.advance(JobStatus::Running), None);
    }

    #[test]
    fn backwards_transition_is_ignored() {
        let status = JobStatus::Running;
        assert_eq!(status.advance(JobStatus::Pending), None);
    }

    #[test]
    fn job_apply_status_sets_only_on_advance() {
        let mut job = Job::submit(
            TenantId::new("t1"),
            CustomerId::new("c1"),
            "system",
            RulesetView::default(),
            vec!["eu-central-1".to_string()],
            ScanType::Manual,
            vec![],
            Utc::now(),
        );
        assert!(job.apply_status(JobStatus::Running));
        assert!(!job.apply_status(JobStatus::Pending));
        assert_eq!(job.status, JobStatus::Running);
    }
}
