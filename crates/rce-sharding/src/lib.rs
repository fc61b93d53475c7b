// crates/rce-sharding/src/lib.rs
// ============================================================================
// Module: Result Sharding & Storage Engine
// Description: Public API surface for the sharding engine.
// Purpose: Expose the shard codec, distributors, ShardsCollection, storage
// key layout, the in-memory ObjectStore fake, the S3 ObjectStore adapter,
// and the per-tenant write lock registry.
// Dependencies: crate::{codec, collection, distributor, keys, memory_store,
// s3_store, tenant_lock}
// ============================================================================

//! ## Overview
//! The sharding engine persists per-policy per-region finding lists as
//! compact, append-friendly shards with a distinct metadata sidecar, and
//! merges shards across jobs to form a tenant's "latest state" (spec.md
//! §4.2). Writes to that state are serialized per tenant via
//! [`tenant_lock::TenantWriteLocks`] (spec.md §5).

pub mod codec;
pub mod collection;
pub mod distributor;
pub mod keys;
pub mod memory_store;
pub mod s3_store;
pub mod tenant_lock;

pub use codec::CodecError;
pub use codec::compress;
pub use codec::decode_shard;
pub use codec::decompress;
pub use codec::encode_part;
pub use codec::encode_shard;
pub use collection::PartFilter;
pub use collection::ShardsCollection;
pub use distributor::AccountRegionDistributor;
pub use distributor::ShardDistributor;
pub use distributor::ShardId;
pub use distributor::SingleShardDistributor;
pub use distributor::default_distributor_for;
pub use memory_store::InMemoryObjectStore;
pub use s3_store::S3ObjectStore;
pub use tenant_lock::TenantWriteLocks;
