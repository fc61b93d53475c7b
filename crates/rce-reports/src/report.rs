// crates/rce-reports/src/report.rs
// ============================================================================
// Module: Report Kinds
// Description: The four report shapes derived directly from one
// ShardsCollection: digest (counts), details (full resource listing after
// dedup + projection), errors (StatisticsItem error branch), and rules
// (per-rule pass/fail across regions).
// Purpose: spec.md §4.3, redesigned per SPEC_FULL.md from
// report_service.py/rule_report_service.py's digest/details/errors/rules
// endpoints.
// Dependencies: rce-core, rce-sharding, crate::{resource, dedup, statistics}
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rce_core::identifiers::RuleName;
use rce_core::interfaces::MetadataRegistry;
use rce_core::model::Rule;
use rce_core::model::Severity;
use rce_core::model::StatisticsItem;
use rce_sharding::PartFilter;
use rce_sharding::ShardsCollection;
use serde_json::Value;

use crate::dedup::dedup_and_project;
use crate::error::ReportsError;
use crate::resource::CloudResource;
use crate::resource::reconstruct_part;
use crate::statistics::FailedStatistics;
use crate::statistics::failed_statistics;

/// Counts report: total/successful/failed checks and the number of
/// distinct violating resources (spec.md §4.3, digest report).
#[derive(Debug, Clone, PartialEq)]
pub struct DigestReport {
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks_by_severity: BTreeMap<Severity, usize>,
    pub failed_checks_total: usize,
    pub violating_resources: usize,
}

/// Builds the digest report: one entry per distinct policy name present in
/// `collection`, classified successful (zero violating resources across
/// every region) or failed (bucketed by the matching rule's severity).
/// Policies with no catalog entry in `rules` are skipped.
#[must_use]
pub fn digest_report(collection: &ShardsCollection, rules: &BTreeMap<RuleName, Rule>) -> DigestReport {
    let mut total = 0;
    let mut successful = 0;
    let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
    let mut violating_resources: BTreeSet<String> = BTreeSet::new();

    for policy in distinct_policies(collection) {
        let Some(rule) = rules.get(&policy) else { continue };
        total += 1;
        let filter = PartFilter { policy: Some(policy.as_str().to_string()), region: None };
        let mut has_violation = false;
        for part in collection.iter_parts(&filter) {
            for resource in &part.resources {
                has_violation = true;
                violating_resources.insert(serde_json::to_string(resource).unwrap_or_default());
            }
        }
        if has_violation {
            *by_severity.entry(rule.severity).or_insert(0) += 1;
        } else {
            successful += 1;
        }
    }

    DigestReport {
        total_checks: total,
        successful_checks: successful,
        failed_checks_total: by_severity.values().sum(),
        failed_checks_by_severity: by_severity,
        violating_resources: violating_resources.len(),
    }
}

fn distinct_policies(collection: &ShardsCollection) -> BTreeSet<RuleName> {
    collection.iter_parts(&PartFilter::default()).map(|part| RuleName::new(part.policy_name.clone())).collect()
}

/// One rule's dedup'd, field-projected resource listing for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsEntry {
    pub policy: RuleName,
    pub resources: Vec<Value>,
}

/// Builds the details report: `{region -> [DetailsEntry]}`, after resource
/// reconstruction (including per-type relocation, §4.3.2), dedup, and
/// field projection (§4.3.3).
///
/// # Errors
/// Propagates [`ReportsError`] from resource reconstruction or a missing
/// metadata registry entry.
pub fn details_report(collection: &ShardsCollection, rules: &BTreeMap<RuleName, Rule>, registry: &dyn MetadataRegistry) -> Result<BTreeMap<String, Vec<DetailsEntry>>, ReportsError> {
    let mut result: BTreeMap<String, Vec<DetailsEntry>> = BTreeMap::new();

    for part in collection.iter_parts(&PartFilter::default()) {
        let policy = RuleName::new(part.policy_name.clone());
        let Some(rule) = rules.get(&policy) else { continue };
        let metadata = registry.lookup(&policy)?;
        let reconstructed = reconstruct_part(collection.cloud(), rule, part)?;

        let mut by_region: BTreeMap<String, Vec<CloudResource>> = BTreeMap::new();
        for (region, resource) in reconstructed {
            by_region.entry(region).or_default().push(resource);
        }
        for (region, resources) in by_region {
            let projected = dedup_and_project(resources, &metadata);
            result.entry(region).or_default().push(DetailsEntry { policy: policy.clone(), resources: projected });
        }
    }
    Ok(result)
}

/// Errors report: the error-outcome branch of per-job `StatisticsItem`s
/// (spec.md §4.3, errors report), using the same failed-only projection as
/// statistics aggregation's hidden-fields view.
#[must_use]
pub fn errors_report(items: &[StatisticsItem]) -> Vec<FailedStatistics> {
    failed_statistics(items)
}

/// One rule's pass/fail status across every region it ran in: `true` means
/// the region produced zero violating resources.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleReportEntry {
    pub policy: RuleName,
    pub region_status: BTreeMap<String, bool>,
}

/// Builds the rules report: per-rule pass/fail across regions. A region is
/// recorded as failed if any part for that `(policy, region)` carried a
/// violating resource.
#[must_use]
pub fn rules_report(collection: &ShardsCollection) -> Vec<RuleReportEntry> {
    let mut by_policy: BTreeMap<RuleName, BTreeMap<String, bool>> = BTreeMap::new();
    for part in collection.iter_parts(&PartFilter::default()) {
        let policy = RuleName::new(part.policy_name.clone());
        let passed = part.resources.is_empty();
        by_policy
            .entry(policy)
            .or_default()
            .entry(part.location.clone())
            .and_modify(|status| *status = *status && passed)
            .or_insert(passed);
    }
    by_policy.into_iter().map(|(policy, region_status)| RuleReportEntry { policy, region_status }).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rce_core::identifiers::CustomerId;
    use rce_core::identifiers::RuleSourceId;
    use rce_core::identifiers::TenantId;
    use rce_core::model::Cloud;
    use rce_core::model::RuleMetadata;
    use rce_core::model::ShardPart;
    use rce_core::model::StatisticsOutcome;
    use rce_core::static_registry::StaticMetadataRegistry;
    use serde_json::json;

    use super::*;

    fn rule(name: &str, global: bool) -> Rule {
        Rule {
            name: RuleName::new(name),
            rule_source_id: RuleSourceId::new("src"),
            cloud: Cloud::Aws,
            resource_type: "aws.ec2-instance".to_string(),
            severity: Severity::High,
            description: String::new(),
            remediation: String::new(),
            impact: String::new(),
            standards: Default::default(),
            mitre_techniques: vec![],
            article: None,
            service_section: None,
            commit_hash: None,
            updated_date: None,
            source_path: String::new(),
            global,
        }
    }

    fn metadata(name: &str, reported_fields: &[&str]) -> RuleMetadata {
        RuleMetadata {
            rule_name: RuleName::new(name),
            severity: Severity::High,
            standards: Default::default(),
            mitre_techniques: vec![],
            remediation: String::new(),
            reported_fields: reported_fields.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn digest_report_counts_successful_and_failed() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "x"})]));
        collection.put_part(ShardPart::new("r2", "us-east-1", 1.0, vec![]));

        let rules = BTreeMap::from([(RuleName::new("r1"), rule("r1", false)), (RuleName::new("r2"), rule("r2", false))]);
        let digest = digest_report(&collection, &rules);
        assert_eq!(digest.total_checks, 2);
        assert_eq!(digest.successful_checks, 1);
        assert_eq!(digest.failed_checks_total, 1);
        assert_eq!(digest.violating_resources, 1);
    }

    #[test]
    fn details_report_groups_by_effective_region() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "x", "resource_type": "aws.ec2-instance"})]));

        let rules = BTreeMap::from([(RuleName::new("r1"), rule("r1", false))]);
        let registry = StaticMetadataRegistry::new([metadata("r1", &["id"])]);
        let details = details_report(&collection, &rules, &registry).expect("ok");
        assert_eq!(details.get("us-east-1").map(Vec::len), Some(1));
    }

    #[test]
    fn global_rule_groups_under_multiregion() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "x"})]));

        let rules = BTreeMap::from([(RuleName::new("r1"), rule("r1", true))]);
        let registry = StaticMetadataRegistry::new([metadata("r1", &["id"])]);
        let details = details_report(&collection, &rules, &registry).expect("ok");
        assert!(details.contains_key("multiregion"));
    }

    #[test]
    fn rules_report_marks_region_failed_on_any_violation() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "x"})]));
        collection.put_part(ShardPart::new("r1", "eu-west-1", 1.0, vec![]));

        let report = rules_report(&collection);
        let entry = report.iter().find(|e| e.policy == RuleName::new("r1")).expect("entry");
        assert_eq!(entry.region_status.get("us-east-1"), Some(&false));
        assert_eq!(entry.region_status.get("eu-west-1"), Some(&true));
    }

    #[test]
    fn errors_report_projects_error_statistics() {
        let start = Utc::now();
        let items = vec![StatisticsItem {
            policy: "r1".to_string(),
            region: "us-east-1".to_string(),
            tenant_id: TenantId::new("t"),
            customer_id: CustomerId::new("c"),
            start,
            end: start,
            api_calls: Default::default(),
            outcome: StatisticsOutcome::Error { error_type: "Throttling".to_string(), reason: "rate limited".to_string(), traceback: None },
        }];
        let errors = errors_report(&items);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, "Throttling");
    }
}
