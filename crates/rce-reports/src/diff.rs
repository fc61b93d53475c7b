// crates/rce-reports/src/diff.rs
// ============================================================================
// Module: Diff
// Description: Two independent diff operations: a ShardsCollection set
// difference (event-driven, §4.3.4) and a plain-data report digest diff
// (diffCloud/diffRegion/diffPolicy, redesigned from the source's dunder
// `__sub__` overloads per the global-state and operator-overload notes).
// Purpose: spec.md §4.3.4; §9 DESIGN NOTES redesign of difference.py.
// Dependencies: rce-core, rce-sharding, serde_json, std::collections
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rce_core::model::ShardPart;
use rce_sharding::PartFilter;
use rce_sharding::ShardsCollection;
use serde_json::Value;

use crate::resource::build_resource;

/// Produces a new `ShardsCollection` containing, per `(rule, region)`, only
/// the resources present in `current` but absent from `previous` — the
/// set difference consumed by event-driven scans (spec.md §4.3.4), matched
/// by resource identity hash rather than full-content equality so a
/// non-identity field edit (e.g. a tag change) does not read as a new
/// resource. Diff is computed once here and is never recomputed on read by
/// callers.
#[must_use]
pub fn diff_collection(current: &ShardsCollection, previous: &ShardsCollection) -> ShardsCollection {
    let cloud = current.cloud();
    let mut previously_seen: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for part in previous.iter_parts(&PartFilter::default()) {
        let seen = previously_seen.entry((part.policy_name.clone(), part.location.clone())).or_default();
        for resource in &part.resources {
            seen.insert(build_resource(cloud, part, resource).identity_hash());
        }
    }

    let mut diff = ShardsCollection::new(current.customer().to_string(), current.cloud(), current.account().to_string());
    for part in current.iter_parts(&PartFilter::default()) {
        let key = (part.policy_name.clone(), part.location.clone());
        let seen = previously_seen.get(&key);
        let new_resources: Vec<Value> = part
            .resources
            .iter()
            .filter(|resource| !seen.is_some_and(|seen| seen.contains(&build_resource(cloud, part, resource).identity_hash())))
            .cloned()
            .collect();
        if !new_resources.is_empty() {
            diff.put_part(ShardPart::new(part.policy_name.clone(), part.location.clone(), part.timestamp, new_resources));
        }
    }
    diff
}

/// A value alongside its signed change since the previous snapshot. `diff`
/// is `None` when there is nothing to compare against (no previous value,
/// or the previous snapshot did not have this entry at all).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueDiff {
    pub value: Option<i64>,
    pub diff: Option<i64>,
}

fn value_diff(value: Option<i64>, previous: Option<i64>) -> ValueDiff {
    match (value, previous) {
        (Some(v), Some(p)) => ValueDiff { value: Some(v), diff: Some(v - p) },
        (value, _) => ValueDiff { value, diff: None },
    }
}

/// A policy's violation count for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDigest {
    pub region: String,
    pub total_violated_resources: Option<i64>,
}

#[must_use]
pub fn diff_region(current: &RegionDigest, previous: Option<&RegionDigest>) -> ValueDiff {
    value_diff(current.total_violated_resources, previous.and_then(|p| p.total_violated_resources))
}

/// One rule's digest entry: its violation counts across every region it
/// ran in.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDigest {
    pub policy: String,
    pub regions: Vec<RegionDigest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDiff {
    pub policy: String,
    pub regions: BTreeMap<String, ValueDiff>,
}

/// Diffs one policy's per-region counts against its previous-snapshot
/// counterpart, matched by region name; a region absent from `previous`
/// diffs against `None` rather than being skipped (mirrors
/// `ServicePolicyData.__sub__`'s fallback-to-empty behavior).
#[must_use]
pub fn diff_policy(current: &PolicyDigest, previous: Option<&PolicyDigest>) -> PolicyDiff {
    let regions = current
        .regions
        .iter()
        .map(|region| {
            let matched = previous.and_then(|p| p.regions.iter().find(|r| r.region == region.region));
            (region.region.clone(), diff_region(region, matched))
        })
        .collect();
    PolicyDiff { policy: current.policy.clone(), regions }
}

/// A tenant's full digest: every rule's per-region counts for one cloud
/// account.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudDigest {
    pub account_id: String,
    pub policies: Vec<PolicyDigest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudDiff {
    pub account_id: String,
    pub policies: Vec<PolicyDiff>,
}

/// Replaces the source's module-level `CLOUD_DATA_TO_EXCLUDE` global with
/// an explicit argument (spec.md §9 DESIGN NOTES).
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Set for `finops` report diffs, which omit per-policy detail.
    pub exclude_policies: bool,
}

/// Diffs a whole cloud account's digest against its previous snapshot,
/// matched by `policy` name.
#[must_use]
pub fn diff_cloud(current: &CloudDigest, previous: Option<&CloudDigest>, options: DiffOptions) -> CloudDiff {
    let policies = if options.exclude_policies {
        Vec::new()
    } else {
        current
            .policies
            .iter()
            .map(|policy| {
                let matched = previous.and_then(|p| p.policies.iter().find(|pp| pp.policy == policy.policy));
                diff_policy(policy, matched)
            })
            .collect()
    };
    CloudDiff { account_id: current.account_id.clone(), policies }
}

#[cfg(test)]
mod tests {
    use rce_core::model::Cloud;
    use serde_json::json;

    use super::*;

    #[test]
    fn diff_collection_keeps_only_new_resources() {
        let mut previous = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        previous.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "a"})]));

        let mut current = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        current.put_part(ShardPart::new("r1", "us-east-1", 2.0, vec![json!({"id": "a"}), json!({"id": "b"})]));

        let diff = diff_collection(&current, &previous);
        let parts: Vec<_> = diff.iter_parts(&PartFilter::default()).collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].resources, vec![json!({"id": "b"})]);
    }

    #[test]
    fn diff_collection_against_empty_previous_keeps_everything() {
        let previous = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        let mut current = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        current.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "a"})]));

        let diff = diff_collection(&current, &previous);
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn diff_collection_ignores_non_identity_field_edits() {
        let mut previous = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        previous.put_part(ShardPart::new("r1", "us-east-1", 1.0, vec![json!({"id": "a", "tags": {"env": "dev"}})]));

        let mut current = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        current.put_part(ShardPart::new("r1", "us-east-1", 2.0, vec![json!({"id": "a", "tags": {"env": "prod"}})]));

        let diff = diff_collection(&current, &previous);
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn diff_region_computes_signed_delta() {
        let current = RegionDigest { region: "us-east-1".to_string(), total_violated_resources: Some(10) };
        let previous = RegionDigest { region: "us-east-1".to_string(), total_violated_resources: Some(4) };
        let diff = diff_region(&current, Some(&previous));
        assert_eq!(diff.diff, Some(6));
    }

    #[test]
    fn diff_region_with_no_previous_has_no_delta() {
        let current = RegionDigest { region: "us-east-1".to_string(), total_violated_resources: Some(10) };
        let diff = diff_region(&current, None);
        assert_eq!(diff.value, Some(10));
        assert_eq!(diff.diff, None);
    }

    #[test]
    fn diff_cloud_excludes_policies_per_options() {
        let current = CloudDigest {
            account_id: "111122223333".to_string(),
            policies: vec![PolicyDigest { policy: "r1".to_string(), regions: vec![] }],
        };
        let diff = diff_cloud(&current, None, DiffOptions { exclude_policies: true });
        assert!(diff.policies.is_empty());
    }
}
