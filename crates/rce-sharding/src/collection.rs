// crates/rce-sharding/src/collection.rs
// ============================================================================
// Module: ShardsCollection
// Description: A tenant's keyed set of shards plus its meta side-channel.
// Purpose: Implement spec.md §4.2 ShardsCollection operations.
// Dependencies: rce-core, crate::{codec, distributor, keys}, tracing
// ============================================================================

//! ## Overview
//! `ShardsCollection` is the in-memory working set for one `(customer,
//! cloud, account)` namespace. Parts are appended via [`ShardsCollection::put_part`]
//! and grouped by the distributor's shard assignment; `write`/`read` move
//! the whole collection to and from the object store, gzip-compressed per
//! shard.

use std::collections::BTreeMap;

use rce_core::interfaces::ObjectStore;
use rce_core::interfaces::ObjectStoreError;
use rce_core::model::Cloud;
use rce_core::model::ShardMeta;
use rce_core::model::ShardPart;

use crate::codec;
use crate::distributor::ShardDistributor;
use crate::distributor::ShardId;
use crate::distributor::default_distributor_for;
use crate::keys;

/// Optional filter applied by [`ShardsCollection::iter_parts`].
#[derive(Debug, Clone, Default)]
pub struct PartFilter {
    pub policy: Option<String>,
    pub region: Option<String>,
}

impl PartFilter {
    fn matches(&self, part: &ShardPart) -> bool {
        self.policy.as_deref().is_none_or(|p| p == part.policy_name)
            && self.region.as_deref().is_none_or(|r| r == part.location)
    }
}

/// A keyed set of shards for one `(customer, cloud, account)` namespace.
pub struct ShardsCollection {
    customer: String,
    cloud: Cloud,
    account: String,
    distributor: Box<dyn ShardDistributor>,
    shards: BTreeMap<ShardId, Vec<ShardPart>>,
    meta: BTreeMap<String, ShardMeta>,
}

impl ShardsCollection {
    /// Creates an empty collection using the default distributor for
    /// `cloud`.
    #[must_use]
    pub fn new(customer: impl Into<String>, cloud: Cloud, account: impl Into<String>) -> Self {
        Self {
            customer: customer.into(),
            cloud,
            account: account.into(),
            distributor: default_distributor_for(cloud),
            shards: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Creates an empty collection with an explicit distributor, bypassing
    /// the per-cloud default (used in tests and for custom deployments).
    #[must_use]
    pub fn with_distributor(
        customer: impl Into<String>,
        cloud: Cloud,
        account: impl Into<String>,
        distributor: Box<dyn ShardDistributor>,
    ) -> Self {
        Self {
            customer: customer.into(),
            cloud,
            account: account.into(),
            distributor,
            shards: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn customer(&self) -> &str {
        &self.customer
    }

    #[must_use]
    pub fn cloud(&self) -> Cloud {
        self.cloud
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[must_use]
    pub fn meta(&self) -> &BTreeMap<String, ShardMeta> {
        &self.meta
    }

    pub fn set_meta(&mut self, policy: impl Into<String>, descriptor: ShardMeta) {
        self.meta.insert(policy.into(), descriptor);
    }

    /// Appends `part` to its distributor-chosen shard. Idempotence is NOT
    /// guaranteed across retries: calling this twice with the same part
    /// after a retried write appends it twice.
    pub fn put_part(&mut self, part: ShardPart) {
        let shard_id = self.distributor.shard_for(&part);
        self.shards.entry(shard_id).or_default().push(part);
    }

    /// Yields parts in shard-then-insertion order, optionally filtered by
    /// policy name and/or region.
    pub fn iter_parts(&self, filter: &PartFilter) -> impl Iterator<Item = &ShardPart> {
        self.shards
            .iter()
            .flat_map(|(_, parts)| parts.iter())
            .filter(move |part| filter.matches(part))
    }

    /// Total number of parts across all shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes every shard to the object store under `raw/{customer}/{cloud}/{account}/latest/`,
    /// plus the `meta.json` sidecar. Each shard is written with a single
    /// atomic `PUT`.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError`] on the first failing write; already
    /// written shards are not rolled back (each shard key is independent,
    /// per spec.md §4.2's per-shard atomicity contract).
    pub async fn write(&self, store: &dyn ObjectStore) -> Result<(), ObjectStoreError> {
        for (shard_id, parts) in &self.shards {
            let raw = codec::encode_shard(parts.iter());
            let gzipped = codec::compress(&raw)
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            let key = keys::latest_shard_key(&self.customer, self.cloud, &self.account, shard_id.as_str());
            store.put(&key, gzipped, Some("gzip")).await?;
            tracing::debug!(shard = %shard_id, bytes = raw.len(), "wrote shard");
        }

        let meta_bytes = serde_json::to_vec(&self.meta).unwrap_or_default();
        let meta_key = keys::latest_meta_key(&self.customer, self.cloud, &self.account);
        store.put(&meta_key, meta_bytes, None).await?;
        Ok(())
    }

    /// Reads every shard under the namespace's `latest/` prefix and
    /// decodes it into this collection.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError`] on listing or read failure, and
    /// propagates a gzip/codec failure as [`ObjectStoreError::Backend`].
    pub async fn read(
        customer: impl Into<String>,
        cloud: Cloud,
        account: impl Into<String>,
        store: &dyn ObjectStore,
    ) -> Result<Self, ObjectStoreError> {
        let customer = customer.into();
        let account = account.into();
        let mut collection = Self::new(customer.clone(), cloud, account.clone());

        let prefix = format!("{}/latest/", keys::namespace_root(&customer, cloud, &account));
        let listing = store.list(&prefix, None).await?;

        for entry in listing {
            if entry.key.ends_with("meta.json") {
                continue;
            }
            let gzipped = store.get(&entry.key).await?;
            let raw = codec::decompress(&gzipped).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            let parts = codec::decode_shard(&raw).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            let shard_id = entry
                .key
                .rsplit('/')
                .next()
                .map(ShardId::new)
                .unwrap_or_else(|| ShardId::new("0"));
            collection.shards.insert(shard_id, parts);
        }

        collection.meta = Self::fetch_meta(&customer, cloud, &account, store).await?;
        Ok(collection)
    }

    /// Fetches only the `meta.json` sidecar, without reading any shard.
    ///
    /// # Errors
    /// Returns [`ObjectStoreError::NotFound`] if no meta sidecar has been
    /// written yet; callers treat a missing sidecar as an empty map.
    pub async fn fetch_meta(
        customer: &str,
        cloud: Cloud,
        account: &str,
        store: &dyn ObjectStore,
    ) -> Result<BTreeMap<String, ShardMeta>, ObjectStoreError> {
        let meta_key = keys::latest_meta_key(customer, cloud, account);
        match store.get(&meta_key).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_default()),
            Err(ObjectStoreError::NotFound(_)) => Ok(BTreeMap::new()),
            Err(other) => Err(other),
        }
    }

    /// Merges `other` into `self`: appends all of `other`'s parts, and
    /// merges meta maps key-by-key with right-bias (per spec.md §4.2,
    /// `other` is "right").
    pub fn merge(&mut self, other: Self) {
        for (shard_id, mut parts) in other.shards {
            self.shards.entry(shard_id).or_default().append(&mut parts);
        }
        for (policy, descriptor) in other.meta {
            self.meta
                .entry(policy)
                .and_modify(|existing| merge_meta_right_bias(existing, &descriptor))
                .or_insert(descriptor);
        }
    }
}

/// Right-biased field merge for one meta descriptor: a populated field on
/// `other` overrides `existing`; an absent field leaves `existing` as-is.
fn merge_meta_right_bias(existing: &mut ShardMeta, other: &ShardMeta) {
    if other.resource.is_some() {
        existing.resource = other.resource.clone();
    }
    if other.description.is_some() {
        existing.description = other.description.clone();
    }
    if other.comment.is_some() {
        existing.comment = other.comment.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(policy: &str, region: &str) -> ShardPart {
        ShardPart::new(policy, region, 1.0, vec![serde_json::json!({"id": "r1"})])
    }

    #[test]
    fn put_part_groups_by_distributor() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(part("rule-a", "us-east-1"));
        collection.put_part(part("rule-b", "eu-west-1"));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.shards.len(), 1, "AWS default distributor puts everything in shard 0");
    }

    #[test]
    fn kubernetes_distributor_splits_by_region() {
        let mut collection = ShardsCollection::new("acme", Cloud::Kubernetes, "cluster-1");
        collection.put_part(part("rule-a", "ns-a"));
        collection.put_part(part("rule-b", "ns-b"));
        assert_eq!(collection.shards.len(), 2);
    }

    #[test]
    fn iter_parts_filters_by_policy_and_region() {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        collection.put_part(part("rule-a", "us-east-1"));
        collection.put_part(part("rule-b", "us-east-1"));

        let filter = PartFilter {
            policy: Some("rule-a".to_string()),
            region: None,
        };
        let filtered: Vec<_> = collection.iter_parts(&filter).collect();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].policy_name, "rule-a");
    }

    #[test]
    fn merge_appends_parts_and_right_biases_meta() {
        let mut a = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        a.put_part(part("rule-a", "us-east-1"));
        a.set_meta(
            "rule-a",
            ShardMeta {
                resource: Some("aws.ec2".to_string()),
                description: Some("left".to_string()),
                comment: None,
            },
        );

        let mut b = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        b.put_part(part("rule-a", "eu-west-1"));
        b.set_meta(
            "rule-a",
            ShardMeta {
                resource: None,
                description: Some("right".to_string()),
                comment: Some("from b".to_string()),
            },
        );

        a.merge(b);
        assert_eq!(a.len(), 2);
        let merged = a.meta().get("rule-a").expect("meta present");
        assert_eq!(merged.resource.as_deref(), Some("aws.ec2"));
        assert_eq!(merged.description.as_deref(), Some("right"));
        assert_eq!(merged.comment.as_deref(), Some("from b"));
    }

    fn collection_of(parts: &[(&str, &str)]) -> ShardsCollection {
        let mut collection = ShardsCollection::new("acme", Cloud::Aws, "111122223333");
        for (policy, region) in parts {
            collection.put_part(part(policy, region));
        }
        collection
    }

    fn sorted_keys(collection: &ShardsCollection) -> Vec<(String, String)> {
        let mut keys: Vec<_> = collection
            .iter_parts(&PartFilter::default())
            .map(|p| (p.policy_name.clone(), p.location.clone()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn merge_is_associative_for_disjoint_parts() {
        let a = collection_of(&[("rule-a", "us-east-1")]);
        let b = collection_of(&[("rule-b", "eu-west-1")]);
        let c = collection_of(&[("rule-c", "ap-south-1")]);

        let mut left = collection_of(&[("rule-a", "us-east-1")]);
        left.merge(collection_of(&[("rule-b", "eu-west-1")]));
        left.merge(c);

        let mut right = a;
        let mut bc = b;
        bc.merge(collection_of(&[("rule-c", "ap-south-1")]));
        right.merge(bc);

        assert_eq!(sorted_keys(&left), sorted_keys(&right));
    }
}
