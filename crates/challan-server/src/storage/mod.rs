//! Object storage for uploaded inputs and generated outputs
//!
//! [`Storage`] talks to an S3-compatible bucket. The pipeline only depends on
//! the [`ObjectStore`] capability, so tests can run against an in-memory bucket.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use chrono::{DateTime, Utc};
use challan_common::StorageObject;
use tracing::{debug, info, instrument};

pub mod config;

/// Content type of every object the pipeline writes.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// The bucket operations the batch pipeline relies on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List up to `limit` objects of the bucket, in no particular order.
    async fn list_objects(&self, limit: usize) -> Result<Vec<StorageObject>>;

    /// Create or overwrite `key`.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<UploadResult>;

    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Public URL a client can download `key` from.
    fn object_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    config: config::StorageConfig,
}

impl Storage {
    pub fn new(config: config::StorageConfig) -> Self {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "challan-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(bucket = %config.bucket, "Storage client initialized");

        Self { client, config }
    }

    #[instrument(skip(self, data), fields(bucket = %self.config.bucket))]
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadResult> {
        let checksum = calculate_sha256(&data);
        let size = data.len() as u64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.config.bucket, key);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload to S3: {}", key))?;

        info!(size, checksum = %checksum, "Uploaded s3://{}/{}", self.config.bucket, key);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete from S3: {}", key))?;

        info!("Deleted s3://{}/{}", self.config.bucket, key);

        Ok(())
    }

    /// List objects with their sizes and timestamps, following continuation
    /// tokens until `limit` objects were collected or the bucket is exhausted.
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    pub async fn list(&self, limit: usize) -> Result<Vec<StorageObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let remaining = limit.saturating_sub(objects.len());
            if remaining == 0 {
                break;
            }

            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .max_keys(i32::try_from(remaining.min(1000)).unwrap_or(1000))
                .set_continuation_token(continuation.take())
                .send()
                .await
                .context("Failed to list S3 objects")?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                let created_at = object
                    .last_modified()
                    .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

                objects.push(StorageObject {
                    name: key.to_string(),
                    size_bytes: object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                    created_at,
                });
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                },
                _ => break,
            }
        }

        objects.truncate(limit);
        debug!(count = objects.len(), "Listed bucket objects");

        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for Storage {
    async fn list_objects(&self, limit: usize) -> Result<Vec<StorageObject>> {
        self.list(limit).await
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadResult> {
        self.upload(key, data, content_type).await
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.delete(key).await
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: u64,
}

pub(crate) fn calculate_sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
