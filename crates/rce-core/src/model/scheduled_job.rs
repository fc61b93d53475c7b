// crates/rce-core/src/model/scheduled_job.rs
// ============================================================================
// Module: ScheduledJob
// Description: A recurring trigger registered against the external
// scheduler.
// Purpose: Canonical type for spec.md §3 ScheduledJob, §4.4 cron scheduler.
// Dependencies: crate::identifiers, serde
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::RulesetName;
use crate::identifiers::ScheduledJobId;
use crate::identifiers::TenantId;

/// A recurring trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: ScheduledJobId,
    pub customer_id: CustomerId,
    pub tenant_id: TenantId,
    /// Raw cron-or-rate expression as registered with the external
    /// scheduler; validated by `rce-trigger` before a record is created.
    pub schedule_expression: String,
    pub target_regions: Vec<String>,
    pub target_rulesets: Vec<RulesetName>,
    pub enabled: bool,
}
