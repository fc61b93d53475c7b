// crates/rce-core/src/model/statistics.rs
// ============================================================================
// Module: StatisticsItem
// Description: Per-rule per-region execution record.
// Purpose: Canonical type for spec.md §3 StatisticsItem, §4.3.7 aggregation.
// Dependencies: crate::identifiers, std::collections::BTreeMap, chrono, serde
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CustomerId;
use crate::identifiers::TenantId;

/// The two mutually-exclusive outcome shapes a `StatisticsItem` may carry.
///
/// # Invariants
/// - Exactly one of `Resources` or `Error` is populated per item; this is
///   enforced by construction rather than by optional fields on a flat
///   struct, so a caller cannot accidentally read `scanned` off an errored
///   item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsOutcome {
    Resources {
        scanned: Option<u32>,
        failed: Option<u32>,
    },
    Error {
        error_type: String,
        reason: String,
        traceback: Option<String>,
    },
}

/// Per-rule per-region execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsItem {
    pub policy: String,
    pub region: String,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub api_calls: BTreeMap<String, u64>,
    pub outcome: StatisticsOutcome,
}

impl StatisticsItem {
    /// Execution duration in seconds.
    #[must_use]
    pub fn exec_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// `true` when this item recorded an error rather than a scan outcome.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, StatisticsOutcome::Error { .. })
    }
}
