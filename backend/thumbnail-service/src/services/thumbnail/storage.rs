//! Object storage for originals and thumbnails
//!
//! `ObjectStore` is the seam the pipeline and the gallery handler depend on;
//! `S3ObjectStore` is the production implementation on top of aws-sdk-s3.

use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's bytes. A missing object is `AppError::NotFound`.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Write (or overwrite) an object.
    async fn store(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Every object key currently in the bucket.
    async fn list(&self, bucket: &str) -> Result<Vec<String>>;
}

/// S3-backed object store
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        let client = Client::new(config);
        info!(region = ?config.region(), "S3 client initialized");
        Self::new(client)
    }
}

/// Shared AWS configuration for the S3 and SNS clients
///
/// Static credentials are used when configured, otherwise the default
/// AWS credential chain applies.
pub async fn load_aws_config(config: &Config) -> aws_config::SdkConfig {
    use aws_sdk_s3::config::{Credentials, Region};

    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        let credentials = Credentials::new(
            access_key,
            secret_key,
            None, // No session token
            None, // No expiration
            "thumbnail_service",
        );
        builder = builder.credentials_provider(credentials);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    builder.load().await
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes> {
        debug!(bucket = %bucket, key = %key, "Downloading from S3");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    AppError::NotFound(format!("s3://{}/{}", bucket, key))
                } else {
                    AppError::Transport(format!("S3 download failed: {e}"))
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read S3 object body: {e}")))?
            .into_bytes();

        debug!(bucket = %bucket, key = %key, size = bytes.len(), "Downloaded from S3");
        Ok(bytes)
    }

    async fn store(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let size = data.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("S3 upload failed: {e}")))?;

        info!(bucket = %bucket, key = %key, size, "Uploaded to S3");
        Ok(())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| AppError::Transport(format!("S3 list failed: {e}")))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(bucket = %bucket, count = keys.len(), "Listed S3 objects");
        Ok(keys)
    }
}
