// crates/rce-sharding/src/distributor.rs
// ============================================================================
// Module: Shard Distributors
// Description: Shard-assignment strategies for incoming ShardParts.
// Purpose: Implement spec.md §4.2 distributors (SingleShardDistributor,
// AccountRegionDistributor).
// Dependencies: rce-core
// ============================================================================

use rce_core::model::Cloud;
use rce_core::model::ShardPart;

/// Identifier of one shard within a `ShardsCollection`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(String);

impl ShardId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Shard-assignment strategy: maps a part to the shard it is appended to.
pub trait ShardDistributor: Send + Sync {
    /// Returns the shard a part is assigned to.
    fn shard_for(&self, part: &ShardPart) -> ShardId;
}

/// All parts go to shard `0`. Used for AWS/AZURE/GOOGLE by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleShardDistributor;

impl ShardDistributor for SingleShardDistributor {
    fn shard_for(&self, _part: &ShardPart) -> ShardId {
        ShardId::new("0")
    }
}

/// Shard key is the part's `location`. Used for KUBERNETES, which produces
/// a bounded set of shards (one per namespace/cluster region).
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountRegionDistributor;

impl ShardDistributor for AccountRegionDistributor {
    fn shard_for(&self, part: &ShardPart) -> ShardId {
        ShardId::new(part.location.clone())
    }
}

/// Returns the default distributor for a cloud, per spec.md §4.2.
#[must_use]
pub fn default_distributor_for(cloud: Cloud) -> Box<dyn ShardDistributor> {
    match cloud {
        Cloud::Aws | Cloud::Azure | Cloud::Google => Box::new(SingleShardDistributor),
        Cloud::Kubernetes => Box::new(AccountRegionDistributor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(location: &str) -> ShardPart {
        ShardPart::new("rule", location, 0.0, vec![])
    }

    #[test]
    fn single_shard_distributor_always_zero() {
        let d = SingleShardDistributor;
        assert_eq!(d.shard_for(&part("us-east-1")), ShardId::new("0"));
        assert_eq!(d.shard_for(&part("eu-west-1")), ShardId::new("0"));
    }

    #[test]
    fn account_region_distributor_keys_by_location() {
        let d = AccountRegionDistributor;
        assert_eq!(d.shard_for(&part("cluster-a")), ShardId::new("cluster-a"));
        assert_eq!(d.shard_for(&part("cluster-b")), ShardId::new("cluster-b"));
    }

    #[test]
    fn default_distributor_matches_cloud() {
        assert_eq!(
            default_distributor_for(Cloud::Aws).shard_for(&part("x")),
            ShardId::new("0")
        );
        assert_eq!(
            default_distributor_for(Cloud::Kubernetes).shard_for(&part("x")),
            ShardId::new("x")
        );
    }
}
