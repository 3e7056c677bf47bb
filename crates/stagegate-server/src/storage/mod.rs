//! Object storage access
//!
//! The triage flow only needs three operations on the staging bucket, so it
//! talks to an [`ObjectStore`] trait object. [`S3ObjectStore`] backs it with
//! S3 or MinIO; [`memory::MemoryObjectStore`] backs tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

pub mod config;
pub mod memory;

pub use memory::MemoryObjectStore;

/// Minimal object-store surface used by the triage flow.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the whole object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Server-side copy within one bucket. An existing destination is overwritten.
    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<()>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(config: config::StorageConfig) -> Result<Self> {
        debug!("Initializing storage with config: {:?}", config);

        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.path_style);

        if let Some((access_key, secret_key)) = config.static_credentials() {
            builder = builder.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "stagegate-storage",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            region = %config.region,
            endpoint = ?config.endpoint,
            "Storage client initialized"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    /// Upload an object. Used to stage fixtures; the triage flow never writes.
    #[instrument(skip(self, data))]
    pub async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(ByteStream::from(data))
            .send()
            .await
            .context(format!("Failed to upload to S3: {}", key))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        debug!("Downloading from s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context(format!("Failed to download from S3: {}", key))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);

        Ok(data)
    }

    #[instrument(skip(self))]
    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .context(format!("Failed to copy S3 object {} to {}", source_key, dest_key))?;

        info!("Copied s3://{}/{} to s3://{}/{}", bucket, source_key, bucket, dest_key);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context(format!("Failed to delete from S3: {}", key))?;

        info!("Deleted s3://{}/{}", bucket, key);

        Ok(())
    }
}

/// `CopySource` value: bucket plus the URL-encoded key, path separators kept.
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", bucket, encoded.join("/"))
}
