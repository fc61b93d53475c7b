// crates/rce-core/src/model/batch_result.rs
// ============================================================================
// Module: BatchResult
// Description: Reactive/event-driven counterpart of Job.
// Purpose: Canonical type for spec.md §3 BatchResult.
// Dependencies: crate::{identifiers, model::job}, chrono, serde
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::identifiers::BatchResultId;
use crate::identifiers::CustomerId;
use crate::identifiers::TenantId;
use crate::model::job::JobStatus;
use crate::model::job::RegionRuleMap;

/// Start/end bounds of the audit-event window a `BatchResult` covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The event-driven analogue of a Job. Shares [`JobStatus`] lifecycle
/// semantics; produced by the event router rather than `SubmitJob`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: BatchResultId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub cloud_identifier: String,
    pub registration_window: RegistrationWindow,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    /// `{region -> {rule-name}}` selected for this batch.
    pub regions: RegionRuleMap,
    /// Idempotency key for event-driven creation: `(tenant, region,
    /// event-hash)` per spec.md §5 ("BatchResult creation must therefore
    /// be idempotent keyed on (tenant, region, event-hash)"). `None` for
    /// batches not created by the event router.
    pub dedup_key: Option<String>,
}

impl BatchResult {
    /// Builds a freshly created batch result in `Submitted` status.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        customer_id: CustomerId,
        cloud_identifier: impl Into<String>,
        registration_window: RegistrationWindow,
        regions: RegionRuleMap,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BatchResultId::new(Uuid::new_v4()),
            tenant_id,
            customer_id,
            cloud_identifier: cloud_identifier.into(),
            registration_window,
            submitted_at,
            status: JobStatus::Submitted,
            regions,
            dedup_key: None,
        }
    }

    /// Builds a batch result carrying an event-router dedup key.
    #[must_use]
    pub fn new_with_dedup_key(
        tenant_id: TenantId,
        customer_id: CustomerId,
        cloud_identifier: impl Into<String>,
        registration_window: RegistrationWindow,
        regions: RegionRuleMap,
        submitted_at: DateTime<Utc>,
        dedup_key: impl Into<String>,
    ) -> Self {
        let mut batch_result = Self::new(tenant_id, customer_id, cloud_identifier, registration_window, regions, submitted_at);
        batch_result.dedup_key = Some(dedup_key.into());
        batch_result
    }

    /// Applies a worker status report using the same monotonic rule as
    /// [`crate::model::job::Job::apply_status`].
    pub fn apply_status(&mut self, reported: JobStatus) -> bool {
        match self.status.advance(reported) {
            Some(next) if next != self.status => {
                self.status = next;
                true
            }
            _ => false,
        }
    }
}
