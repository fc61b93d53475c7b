// crates/rce-trigger/src/event_router.rs
// ============================================================================
// Module: Event Router
// Description: Filters/maps AWS EventBridge (CloudTrail) and MAESTRO audit
// events into deduplicated BatchResult creation requests.
// Purpose: spec.md §4.4 event router. Grounded in
// original_source/src/services/event_processor_service.py's
// EventBridgeEventProcessor/MaestroEventProcessor (account-id extraction,
// CloudTrail mapping lookup, MAESTRO sub_group/action composition).
// Dependencies: rce-core, chrono, serde_json, sha2
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::DateTime;
use chrono::Utc;
use rce_core::identifiers::CustomerId;
use rce_core::identifiers::TenantId;
use rce_core::model::BatchResult;
use rce_core::model::RegistrationWindow;
use serde_json::Value;
use sha2::Digest;
use tracing::warn;

const CLOUDTRAIL_API_CALL_DETAIL_TYPE: &str = "AWS API Call via CloudTrail";

/// `{source -> {event-name -> [rule-names]}}` CloudTrail mapping (spec.md
/// §4.4's `{source → name → [rule-names]}`).
#[derive(Debug, Clone, Default)]
pub struct CloudTrailMapping(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl CloudTrailMapping {
    #[must_use]
    pub fn new(mapping: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Self {
        Self(mapping)
    }

    fn rules_for(&self, source: &str, name: &str) -> Vec<String> {
        self.0.get(source).and_then(|names| names.get(name)).cloned().unwrap_or_default()
    }
}

/// `{sub_group -> action -> [(event-source, event-name)]}` MAESTRO mapping,
/// composed with a per-cloud `{event-source -> {event-name -> [rules]}}`
/// mapping to resolve rules (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct MaestroActionMapping(BTreeMap<String, BTreeMap<String, Vec<(String, String)>>>);

impl MaestroActionMapping {
    #[must_use]
    pub fn new(mapping: BTreeMap<String, BTreeMap<String, Vec<(String, String)>>>) -> Self {
        Self(mapping)
    }

    fn events_for(&self, sub_group: &str, action: &str) -> &[(String, String)] {
        self.0.get(sub_group).and_then(|actions| actions.get(action)).map_or(&[], Vec::as_slice)
    }
}

/// Per-cloud `{event-source -> {event-name -> [rule-names]}}` mapping used
/// with [`MaestroActionMapping`] to resolve rules for one MAESTRO event.
#[derive(Debug, Clone, Default)]
pub struct CloudEventMapping(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl CloudEventMapping {
    #[must_use]
    pub fn new(mapping: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Self {
        Self(mapping)
    }

    fn rules_for(&self, event_source: &str, event_name: &str) -> Vec<String> {
        self.0.get(event_source).and_then(|names| names.get(event_name)).cloned().unwrap_or_default()
    }
}

/// The two supported clouds for MAESTRO audit feeds (spec.md §4.4:
/// `cloud ∈ {AZURE, GOOGLE}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MaestroCloud {
    Azure,
    Google,
}

impl MaestroCloud {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "AZURE" => Some(Self::Azure),
            "GOOGLE" => Some(Self::Google),
            _ => None,
        }
    }
}

/// One `(tenant, region)` (or `(cloud, tenant, region)` for MAESTRO) batch
/// produced by the router, ready to be turned into a [`BatchResult`].
#[derive(Debug, Clone)]
pub struct RoutedBatch {
    pub cloud_identifier: String,
    pub tenant_id: TenantId,
    pub region: String,
    pub rules: BTreeSet<String>,
    pub dedup_key: String,
}

/// Outcome of one routing pass.
#[derive(Debug, Clone, Default)]
pub struct RoutingOutcome {
    pub batches: Vec<RoutedBatch>,
    /// Count of input records dropped by filtering (self-noise, missing
    /// fields, no matched rules).
    pub dropped: usize,
}

/// Filters and maps a batch of raw EventBridge records into routed groups.
///
/// Drops records whose `detail-type` is not `"AWS API Call via CloudTrail"`,
/// whose account equals `self_account_id` (self-noise per spec.md §4.4), or
/// for which no `(account, region, rules)` triple can be extracted.
/// Groups survivors by `(account, region)` and deduplicates by a content
/// hash of the contributing records, matching spec.md §5's
/// `(tenant, region, event-hash)` idempotency key.
#[must_use]
pub fn route_aws_events(events: &[Value], mapping: &CloudTrailMapping, self_account_id: &str) -> RoutingOutcome {
    let mut groups: BTreeMap<(String, String), (BTreeSet<String>, Vec<String>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in events {
        let Some(detail) = extract_cloudtrail_detail(record) else {
            dropped += 1;
            continue;
        };
        let Some(account_id) = detail.get("userIdentity").and_then(|identity| identity.get("accountId")).and_then(Value::as_str) else {
            dropped += 1;
            continue;
        };
        if account_id == self_account_id {
            dropped += 1;
            continue;
        }
        let Some(region) = detail.get("awsRegion").and_then(Value::as_str) else {
            dropped += 1;
            continue;
        };
        let (source, name) = match (detail.get("eventSource").and_then(Value::as_str), detail.get("eventName").and_then(Value::as_str)) {
            (Some(source), Some(name)) => (source, name),
            _ => {
                dropped += 1;
                continue;
            }
        };
        let rules = mapping.rules_for(source, name);
        if rules.is_empty() {
            warn!(source, name, "no rules mapped for CloudTrail event");
            dropped += 1;
            continue;
        }

        let entry = groups.entry((account_id.to_string(), region.to_string())).or_default();
        entry.0.extend(rules);
        entry.1.push(canonical_json(record));
    }

    RoutingOutcome {
        batches: groups
            .into_iter()
            .map(|((account_id, region), (rules, contributing))| RoutedBatch {
                dedup_key: dedup_key(&account_id, &region, &contributing),
                cloud_identifier: account_id.clone(),
                tenant_id: TenantId::new(account_id),
                region,
                rules,
            })
            .collect(),
        dropped,
    }
}

/// Extracts the `detail` object of an EventBridge record whose
/// `detail-type` marks it as a CloudTrail API call; returns `None`
/// otherwise (including for non-CloudTrail EventBridge records, which this
/// router does not route).
fn extract_cloudtrail_detail(record: &Value) -> Option<&Value> {
    if record.get("detail-type").and_then(Value::as_str) != Some(CLOUDTRAIL_API_CALL_DETAIL_TYPE) {
        return None;
    }
    record.get("detail")
}

/// Filters and maps a batch of raw MAESTRO audit events into routed groups.
///
/// Keeps only events with `group = "MANAGEMENT"`, `subGroup = "INSTANCE"`,
/// and `eventMetadata.request.cloud ∈ {AZURE, GOOGLE}` (spec.md §4.4).
/// Groups survivors by `(cloud, tenant, region)`; AZURE and GOOGLE events
/// carry no native region in the feed, so region resolution is deferred to
/// the caller via `region_for` (spec.md's original processor hard-codes a
/// global-region placeholder for these clouds; callers here supply the
/// mapping explicitly instead of relying on a baked-in constant).
#[must_use]
pub fn route_maestro_events(
    events: &[Value],
    action_mapping: &MaestroActionMapping,
    azure_mapping: &CloudEventMapping,
    google_mapping: &CloudEventMapping,
    region_for: impl Fn(MaestroCloud) -> &'static str,
) -> RoutingOutcome {
    let mut groups: BTreeMap<(MaestroCloud, String, String), (BTreeSet<String>, Vec<String>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in events {
        if record.get("group").and_then(Value::as_str) != Some("MANAGEMENT") || record.get("subGroup").and_then(Value::as_str) != Some("INSTANCE") {
            dropped += 1;
            continue;
        }
        let Some(cloud_raw) = record.get("eventMetadata").and_then(|metadata| metadata.get("request")).and_then(|request| request.get("cloud")).and_then(Value::as_str) else {
            dropped += 1;
            continue;
        };
        let Some(cloud) = MaestroCloud::parse(cloud_raw) else {
            dropped += 1;
            continue;
        };
        let Some(tenant) = record.get("tenantName").and_then(Value::as_str) else {
            dropped += 1;
            continue;
        };
        let (Some(sub_group), Some(action)) = (record.get("subGroup").and_then(Value::as_str), record.get("eventAction").and_then(Value::as_str)) else {
            dropped += 1;
            continue;
        };

        let per_cloud_mapping = match cloud {
            MaestroCloud::Azure => azure_mapping,
            MaestroCloud::Google => google_mapping,
        };
        let rules: BTreeSet<String> = action_mapping
            .events_for(sub_group, action)
            .iter()
            .flat_map(|(event_source, event_name)| per_cloud_mapping.rules_for(event_source, event_name))
            .collect();
        if rules.is_empty() {
            warn!(cloud = cloud_raw, sub_group, action, "no rules mapped for MAESTRO event");
            dropped += 1;
            continue;
        }

        let region = region_for(cloud).to_string();
        let entry = groups.entry((cloud, tenant.to_string(), region)).or_default();
        entry.0.extend(rules);
        entry.1.push(canonical_json(record));
    }

    RoutingOutcome {
        batches: groups
            .into_iter()
            .map(|((cloud, tenant, region), (rules, contributing))| {
                let cloud_identifier = format!("{cloud:?}").to_uppercase();
                RoutedBatch {
                    dedup_key: dedup_key(&tenant, &region, &contributing),
                    cloud_identifier,
                    tenant_id: TenantId::new(tenant),
                    region,
                    rules,
                }
            })
            .collect(),
        dropped,
    }
}

/// Builds the idempotency key `(tenant, region, event-hash)` of spec.md §5.
fn dedup_key(tenant: &str, region: &str, contributing: &[String]) -> String {
    let mut sorted = contributing.to_vec();
    sorted.sort();
    let mut hasher = sha2::Sha256::new();
    for event in &sorted {
        hasher.update(event.as_bytes());
        hasher.update(b"\x00");
    }
    let digest = hasher.finalize();
    format!("{tenant}:{region}:{digest:x}")
}

fn canonical_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Turns a [`RoutedBatch`] into a [`BatchResult`], skipping creation when an
/// identically-keyed batch already exists (spec.md §5's cross-invocation
/// idempotency requirement).
#[must_use]
pub fn batch_result_from_routed(
    routed: &RoutedBatch,
    customer_id: CustomerId,
    registration_window: RegistrationWindow,
    submitted_at: DateTime<Utc>,
) -> BatchResult {
    let mut regions = BTreeMap::new();
    regions.insert(routed.region.clone(), routed.rules.iter().cloned().collect());
    BatchResult::new_with_dedup_key(
        routed.tenant_id.clone(),
        customer_id,
        routed.cloud_identifier.clone(),
        registration_window,
        regions,
        submitted_at,
        routed.dedup_key.clone(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cloudtrail_mapping() -> CloudTrailMapping {
        let mut inner = BTreeMap::new();
        inner.insert("iam.amazonaws.com".to_string(), vec!["put_user_policy".to_string()].into_iter().map(|name| (name, vec!["IAM_001".to_string()])).collect());
        CloudTrailMapping::new(inner)
    }

    fn cloudtrail_record(account: &str, region: &str, source: &str, name: &str) -> Value {
        json!({
            "detail-type": CLOUDTRAIL_API_CALL_DETAIL_TYPE,
            "detail": {
                "eventSource": source,
                "eventName": name,
                "awsRegion": region,
                "userIdentity": { "accountId": account },
            }
        })
    }

    #[test]
    fn routes_and_groups_cloudtrail_events_by_account_and_region() {
        let mapping = cloudtrail_mapping();
        let events = vec![
            cloudtrail_record("111111111111", "us-east-1", "iam.amazonaws.com", "put_user_policy"),
            cloudtrail_record("111111111111", "us-east-1", "iam.amazonaws.com", "put_user_policy"),
        ];
        let outcome = route_aws_events(&events, &mapping, "999999999999");
        assert_eq!(outcome.batches.len(), 1);
        assert_eq!(outcome.batches[0].rules, BTreeSet::from(["IAM_001".to_string()]));
    }

    #[test]
    fn drops_self_noise() {
        let mapping = cloudtrail_mapping();
        let events = vec![cloudtrail_record("999999999999", "us-east-1", "iam.amazonaws.com", "put_user_policy")];
        let outcome = route_aws_events(&events, &mapping, "999999999999");
        assert!(outcome.batches.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn drops_non_cloudtrail_eventbridge_records() {
        let mapping = cloudtrail_mapping();
        let events = vec![json!({ "detail-type": "Scheduled Event", "source": "aws.events" })];
        let outcome = route_aws_events(&events, &mapping, "999999999999");
        assert!(outcome.batches.is_empty());
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn dedup_key_is_stable_across_reordered_events() {
        let mapping = cloudtrail_mapping();
        let a = vec![
            cloudtrail_record("111111111111", "us-east-1", "iam.amazonaws.com", "put_user_policy"),
            cloudtrail_record("111111111111", "us-east-1", "iam.amazonaws.com", "put_user_policy"),
        ];
        let mut b = a.clone();
        b.reverse();
        let outcome_a = route_aws_events(&a, &mapping, "999999999999");
        let outcome_b = route_aws_events(&b, &mapping, "999999999999");
        assert_eq!(outcome_a.batches[0].dedup_key, outcome_b.batches[0].dedup_key);
    }

    #[test]
    fn routes_maestro_azure_events() {
        let mut action_mapping = BTreeMap::new();
        action_mapping.insert("INSTANCE".to_string(), {
            let mut actions = BTreeMap::new();
            actions.insert("update".to_string(), vec![("Microsoft.Compute".to_string(), "virtualMachines/write".to_string())]);
            actions
        });
        let action_mapping = MaestroActionMapping::new(action_mapping);

        let mut azure_inner = BTreeMap::new();
        azure_inner.insert("Microsoft.Compute".to_string(), vec![("virtualMachines/write".to_string(), vec!["AZURE_VM_001".to_string()])].into_iter().collect());
        let azure_mapping = CloudEventMapping::new(azure_inner);
        let google_mapping = CloudEventMapping::default();

        let event = json!({
            "group": "MANAGEMENT",
            "subGroup": "INSTANCE",
            "eventAction": "update",
            "tenantName": "tenant-one",
            "eventMetadata": { "request": { "cloud": "AZURE" } },
        });

        let outcome = route_maestro_events(&[event], &action_mapping, &azure_mapping, &google_mapping, |_cloud| "global");
        assert_eq!(outcome.batches.len(), 1);
        assert_eq!(outcome.batches[0].cloud_identifier, "AZURE");
        assert_eq!(outcome.batches[0].rules, BTreeSet::from(["AZURE_VM_001".to_string()]));
    }

    #[test]
    fn drops_maestro_events_outside_instance_management_scope() {
        let action_mapping = MaestroActionMapping::default();
        let azure_mapping = CloudEventMapping::default();
        let google_mapping = CloudEventMapping::default();
        let event = json!({ "group": "MANAGEMENT", "subGroup": "OTHER", "eventAction": "update" });
        let outcome = route_maestro_events(&[event], &action_mapping, &azure_mapping, &google_mapping, |_cloud| "global");
        assert!(outcome.batches.is_empty());
    }
}
