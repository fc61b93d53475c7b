// crates/rce-reports/src/statistics.rs
// ============================================================================
// Module: Statistics Aggregation
// Description: Averages StatisticsItem records per (policy, region).
// Purpose: spec.md §4.3.7.
// Dependencies: rce-core
// ============================================================================

use std::collections::BTreeMap;

use rce_core::model::StatisticsItem;
use rce_core::model::StatisticsOutcome;

/// Per-`(policy, region)` averaged execution statistics.
///
/// # Open Question
/// `average_resources_scanned`/`average_resources_failed` are an unweighted
/// mean across invocations with differing resource counts — not a true
/// weighted mean. This reproduces the source behavior verbatim; a future
/// fix should weight by invocation (see DESIGN.md).
#[derive(Debug, Clone, PartialEq)]
pub struct AverageStatistics {
    pub policy: String,
    pub region: String,
    pub invocations: usize,
    pub succeeded_invocations: usize,
    pub failed_invocations: usize,
    pub total_api_calls: BTreeMap<String, u64>,
    pub min_exec: f64,
    pub max_exec: f64,
    pub total_exec: f64,
    pub average_exec: f64,
    pub resources_scanned: u64,
    pub resources_failed: u64,
    pub average_resources_scanned: f64,
    pub average_resources_failed: f64,
}

/// Failed-only projection of [`AverageStatistics`]: hides
/// tenant/customer/timing/api-call/scan-count fields, keeping only
/// `policy`/`region`/`reason`/`error_type` (spec.md §4.3.7).
#[derive(Debug, Clone, PartialEq)]
pub struct FailedStatistics {
    pub policy: String,
    pub region: String,
    pub error_type: String,
    pub reason: String,
}

/// Groups `items` by `(policy, region)` and averages each group.
#[must_use]
pub fn average_statistics(items: &[StatisticsItem]) -> Vec<AverageStatistics> {
    let mut groups: BTreeMap<(String, String), Vec<&StatisticsItem>> = BTreeMap::new();
    for item in items {
        groups.entry((item.policy.clone(), item.region.clone())).or_default().push(item);
    }

    groups
        .into_iter()
        .map(|((policy, region), items)| {
            let mut total_api_calls: BTreeMap<String, u64> = BTreeMap::new();
            let mut executions = Vec::with_capacity(items.len());
            let mut scanned = Vec::new();
            let mut failed = Vec::new();
            let mut failed_invocations = 0;

            for item in &items {
                for (call, count) in &item.api_calls {
                    *total_api_calls.entry(call.clone()).or_insert(0) += *count;
                }
                executions.push(item.exec_seconds());
                match &item.outcome {
                    StatisticsOutcome::Resources { scanned: s, failed: f } => {
                        if let Some(s) = s {
                            scanned.push(*s as u64);
                        }
                        if let Some(f) = f {
                            failed.push(*f as u64);
                        }
                    }
                    StatisticsOutcome::Error { .. } => failed_invocations += 1,
                }
            }

            if scanned.is_empty() {
                scanned.push(0);
            }
            if failed.is_empty() {
                failed.push(0);
            }

            AverageStatistics {
                policy,
                region,
                invocations: items.len(),
                succeeded_invocations: items.len() - failed_invocations,
                failed_invocations,
                total_api_calls,
                min_exec: executions.iter().cloned().fold(f64::INFINITY, f64::min),
                max_exec: executions.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                total_exec: executions.iter().sum(),
                average_exec: mean(&executions),
                resources_scanned: scanned.iter().sum(),
                resources_failed: failed.iter().sum(),
                average_resources_scanned: mean_u64(&scanned),
                average_resources_failed: mean_u64(&failed),
            }
        })
        .collect()
}

/// Projects every error-outcome item in `items` to its [`FailedStatistics`]
/// view.
#[must_use]
pub fn failed_statistics(items: &[StatisticsItem]) -> Vec<FailedStatistics> {
    items
        .iter()
        .filter_map(|item| match &item.outcome {
            StatisticsOutcome::Error { error_type, reason, .. } => Some(FailedStatistics {
                policy: item.policy.clone(),
                region: item.region.clone(),
                error_type: error_type.clone(),
                reason: reason.clone(),
            }),
            StatisticsOutcome::Resources { .. } => None,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn mean_u64(values: &[u64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}
