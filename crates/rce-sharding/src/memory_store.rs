// crates/rce-sharding/src/memory_store.rs
// ============================================================================
// Module: In-Memory Object Store
// Description: ObjectStore fake for tests and local operation.
// Purpose: Exercise the ObjectStore seam without a real backend.
// Dependencies: rce-core, async-trait, tokio::sync::Mutex
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use rce_core::interfaces::ObjectListing;
use rce_core::interfaces::ObjectStore;
use rce_core::interfaces::ObjectStoreError;
use tokio::sync::Mutex;

/// An `ObjectStore` backed by an in-process map. Presigned URLs are
/// synthesized as `memory://{key}?expires_in={secs}` and are not otherwise
/// functional; this store exists for tests and for local/offline operation.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_encoding: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        self.objects.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> Result<u64, ObjectStoreError> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn list(
        &self,
        prefix: &str,
        _delimiter: Option<&str>,
    ) -> Result<Vec<ObjectListing>, ObjectStoreError> {
        Ok(self
            .objects
            .lock()
            .await
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| ObjectListing {
                key: key.clone(),
                size: bytes.len() as u64,
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<(), ObjectStoreError> {
        let bytes = self.get(source).await?;
        self.put(dest, bytes, None).await
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_in_secs: u64,
    ) -> Result<String, ObjectStoreError> {
        if !self.objects.lock().await.contains_key(key) {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{key}?expires_in={expires_in_secs}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryObjectStore::new();
        store.put("a/b", vec![1, 2, 3], None).await.expect("put");
        assert_eq!(store.get("a/b").await.expect("get"), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn get_missing_key_errors() {
        let store = InMemoryObjectStore::new();
        assert!(store.get("missing").await.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = InMemoryObjectStore::new();
        store.put("raw/a/latest/0", vec![1], None).await.expect("put");
        store.put("raw/b/latest/0", vec![1], None).await.expect("put");
        let listed = store.list("raw/a/", None).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "raw/a/latest/0");
    }
}
