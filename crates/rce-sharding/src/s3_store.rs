// crates/rce-sharding/src/s3_store.rs
// ============================================================================
// Module: S3 Object Store
// Description: aws-sdk-s3-backed ObjectStore, the production shape of the
// shard storage backend.
// Purpose: spec.md §6 ObjectStore seam, S3 adapter.
// Dependencies: rce-core, async-trait, aws-sdk-s3, aws-config
// ============================================================================

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use rce_core::interfaces::ObjectListing;
use rce_core::interfaces::ObjectStore;
use rce_core::interfaces::ObjectStoreError;

/// `ObjectStore` backed by a real S3 (or S3-compatible) bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Builds a store against `bucket` using `client`. Construct `client`
    /// via [`aws_config::load_from_env`] (optionally overriding the
    /// endpoint for S3-compatible backends) before calling this.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    fn map_get_error(key: &str, err: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>) -> ObjectStoreError {
        if err.as_service_error().is_some_and(aws_sdk_s3::operation::get_object::GetObjectError::is_no_such_key) {
            ObjectStoreError::NotFound(key.to_string())
        } else {
            ObjectStoreError::Backend(err.to_string())
        }
    }

    fn map_head_error(key: &str, err: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>) -> ObjectStoreError {
        if err.as_service_error().is_some_and(aws_sdk_s3::operation::head_object::HeadObjectError::is_not_found) {
            ObjectStoreError::NotFound(key.to_string())
        } else {
            ObjectStoreError::Backend(err.to_string())
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_encoding: Option<&str>) -> Result<(), ObjectStoreError> {
        let mut request = self.client.put_object().bucket(&self.bucket).key(key).body(ByteStream::from(bytes));
        if let Some(encoding) = content_encoding {
            request = request.content_encoding(encoding);
        }
        request.send().await.map_err(|err| ObjectStoreError::Transient(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let response = self.client.get_object().bucket(&self.bucket).key(key).send().await.map_err(|err| Self::map_get_error(key, err))?;
        let bytes = response.body.collect().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn head(&self, key: &str) -> Result<u64, ObjectStoreError> {
        let response = self.client.head_object().bucket(&self.bucket).key(key).send().await.map_err(|err| Self::map_head_error(key, err))?;
        Ok(u64::try_from(response.content_length().unwrap_or_default()).unwrap_or_default())
    }

    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> Result<Vec<ObjectListing>, ObjectStoreError> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
        if let Some(delimiter) = delimiter {
            request = request.delimiter(delimiter);
        }
        let response = request.send().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        Ok(response
            .contents()
            .iter()
            .map(|object| ObjectListing {
                key: object.key().unwrap_or_default().to_string(),
                size: u64::try_from(object.size().unwrap_or_default()).unwrap_or_default(),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client.delete_object().bucket(&self.bucket).key(key).send().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        Ok(())
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<(), ObjectStoreError> {
        let copy_source = format!("{}/{source}", self.bucket);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source)
            .key(dest)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some() {
                    ObjectStoreError::NotFound(source.to_string())
                } else {
                    ObjectStoreError::Backend(err.to_string())
                }
            })?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in_secs: u64) -> Result<String, ObjectStoreError> {
        let config = PresigningConfig::expires_in(std::time::Duration::from_secs(expires_in_secs)).map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        let presigned = self.client.get_object().bucket(&self.bucket).key(key).presigned(config).await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        Ok(presigned.uri().to_string())
    }
}
