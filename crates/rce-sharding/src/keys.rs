// crates/rce-sharding/src/keys.rs
// ============================================================================
// Module: Storage Key Layout
// Description: Object-store key construction for the result store.
// Purpose: Implement the key layout of spec.md §4.2/§6.
// Dependencies: rce-core, chrono
// ============================================================================

//! ## Overview
//! Key builders are pure string formatting; none of them touch the clock or
//! the object store. Callers supply the reference instant, matching the
//! "core never reads wall-clock time" discipline carried over from the
//! teacher's `core::time` module.

use chrono::DateTime;
use chrono::Utc;
use rce_core::model::Cloud;

fn cloud_segment(cloud: Cloud) -> &'static str {
    match cloud {
        Cloud::Aws => "aws",
        Cloud::Azure => "azure",
        Cloud::Google => "google",
        Cloud::Kubernetes => "kubernetes",
    }
}

/// Truncated-to-hour UTC key segment, e.g. `2024-03-05-14`.
#[must_use]
pub fn hour_segment(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d-%H").to_string()
}

/// `raw/{customer}/{cloud}/{account}` namespace root.
#[must_use]
pub fn namespace_root(customer: &str, cloud: Cloud, account: &str) -> String {
    format!("raw/{customer}/{}/{account}", cloud_segment(cloud))
}

/// Current-state shard key: `raw/{customer}/{cloud}/{account}/latest/{shard_id}`.
#[must_use]
pub fn latest_shard_key(customer: &str, cloud: Cloud, account: &str, shard_id: &str) -> String {
    format!("{}/latest/{shard_id}", namespace_root(customer, cloud, account))
}

/// Meta sidecar key alongside a namespace's `latest/` shards.
#[must_use]
pub fn latest_meta_key(customer: &str, cloud: Cloud, account: &str) -> String {
    format!("{}/latest/meta.json", namespace_root(customer, cloud, account))
}

/// Hourly snapshot prefix: `raw/{customer}/{cloud}/{account}/snapshots/{hour}/`.
#[must_use]
pub fn snapshot_prefix(customer: &str, cloud: Cloud, account: &str, hour: &str) -> String {
    format!("{}/snapshots/{hour}/", namespace_root(customer, cloud, account))
}

/// Common prefix under which every snapshot hour is listed, for the
/// nearest-older lookup.
#[must_use]
pub fn snapshots_root(customer: &str, cloud: Cloud, account: &str) -> String {
    format!("{}/snapshots/", namespace_root(customer, cloud, account))
}

/// Standard job result prefix:
/// `raw/{customer}/{cloud}/{account}/jobs/standard/{hour}/{jobID}/result/`.
#[must_use]
pub fn standard_job_result_prefix(
    customer: &str,
    cloud: Cloud,
    account: &str,
    hour: &str,
    job_id: &str,
) -> String {
    format!(
        "{}/jobs/standard/{hour}/{job_id}/result/",
        namespace_root(customer, cloud, account)
    )
}

/// Event-driven result prefix:
/// `.../jobs/event-driven/{hour}/{brID}/result/`.
#[must_use]
pub fn event_driven_result_prefix(
    customer: &str,
    cloud: Cloud,
    account: &str,
    hour: &str,
    batch_result_id: &str,
) -> String {
    format!(
        "{}/jobs/event-driven/{hour}/{batch_result_id}/result/",
        namespace_root(customer, cloud, account)
    )
}

/// Event-driven difference prefix:
/// `.../jobs/event-driven/{hour}/{brID}/difference/`.
#[must_use]
pub fn event_driven_difference_prefix(
    customer: &str,
    cloud: Cloud,
    account: &str,
    hour: &str,
    batch_result_id: &str,
) -> String {
    format!(
        "{}/jobs/event-driven/{hour}/{batch_result_id}/difference/",
        namespace_root(customer, cloud, account)
    )
}

/// One-time report key: `on-demand/{random}`.
#[must_use]
pub fn on_demand_key(random: &str) -> String {
    format!("on-demand/{random}")
}

/// Given the common-prefix hour segments returned by a snapshot `LIST`
/// (e.g. `["2024-03-05-09", "2024-03-05-14", "2024-03-06-02"]`) and a
/// reference instant, returns the nearest hour that is not after the
/// reference instant, per spec.md §4.2's nearest-older lookup.
///
/// Pure function: the caller is responsible for both the `LIST` call and
/// supplying the reference instant; this performs no I/O and reads no
/// clock.
#[must_use]
pub fn nearest_older_snapshot(hours: &[String], reference: DateTime<Utc>) -> Option<String> {
    let reference_hour = hour_segment(reference);
    hours
        .iter()
        .filter(|hour| hour.as_str() <= reference_hour.as_str())
        .max()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn latest_shard_key_has_expected_shape() {
        let key = latest_shard_key("acme", Cloud::Aws, "111122223333", "0");
        assert_eq!(key, "raw/acme/aws/111122223333/latest/0");
    }

    #[test]
    fn nearest_older_picks_max_not_after_reference() {
        let hours = vec![
            "2024-03-05-09".to_string(),
            "2024-03-05-14".to_string(),
            "2024-03-06-02".to_string(),
        ];
        let reference = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();
        assert_eq!(
            nearest_older_snapshot(&hours, reference),
            Some("2024-03-05-14".to_string())
        );
    }

    #[test]
    fn nearest_older_returns_none_when_all_after_reference() {
        let hours = vec!["2024-03-06-02".to_string()];
        let reference = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();
        assert_eq!(nearest_older_snapshot(&hours, reference), None);
    }
}
