// crates/rce-cli/src/objectstore.rs
// ============================================================================
// Module: Object Store Selection
// Description: Builds the ObjectStore backend named by rce.toml's
// [object_store] section.
// Purpose: Let report commands read shards from either a real S3 bucket or
// the in-memory fake (local/offline operation).
// Dependencies: rce-config, rce-core, rce-sharding, aws-config, aws-sdk-s3
// ============================================================================

use rce_config::ObjectStoreConfig;
use rce_config::ObjectStoreProvider;
use rce_sharding::InMemoryObjectStore;
use rce_sharding::S3ObjectStore;

/// Either backend, dispatched on at the call sites that need `&dyn
/// ObjectStore`.
pub enum AnyObjectStore {
    S3(S3ObjectStore),
    Memory(InMemoryObjectStore),
}

impl AnyObjectStore {
    #[must_use]
    pub fn as_dyn(&self) -> &dyn rce_core::interfaces::ObjectStore {
        match self {
            Self::S3(store) => store,
            Self::Memory(store) => store,
        }
    }
}

/// Builds the configured object store. The `Memory` provider starts empty
/// on every invocation and exists for local/offline demonstration, not
/// durable storage.
pub async fn build(config: &ObjectStoreConfig) -> AnyObjectStore {
    match config.provider {
        ObjectStoreProvider::Memory => AnyObjectStore::Memory(InMemoryObjectStore::new()),
        ObjectStoreProvider::S3 => {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
            }
            let shared_config = loader.load().await;
            let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
            if let Some(endpoint) = &config.endpoint {
                s3_builder = s3_builder.endpoint_url(endpoint.clone());
            }
            if config.allow_http {
                s3_builder = s3_builder.force_path_style(true);
            }
            let client = aws_sdk_s3::Client::from_conf(s3_builder.build());
            let bucket = config.bucket.clone().unwrap_or_default();
            AnyObjectStore::S3(S3ObjectStore::new(client, bucket))
        }
    }
}
