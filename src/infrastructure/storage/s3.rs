use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::ObjectStore;
use crate::common::error::StorageError;
use crate::config::settings::AwsSettings;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

impl StorageService {
    pub fn new(aws: &AwsSettings) -> Self {
        let credentials = Credentials::new(
            &aws.access_key_id,
            &aws.secret_access_key,
            None,
            None,
            "static",
        );

        let mut config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .credentials_provider(credentials);

        // MinIO and other S3-compatible stores need path-style addressing
        if let Some(endpoint) = &aws.s3_endpoint {
            config = config.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(config.build());

        info!(
            "✅ S3 client ready (region {}, endpoint {})",
            aws.region,
            aws.s3_endpoint.as_deref().unwrap_or("default")
        );

        Self { client }
    }

    /// Presigned PUT so a client can upload straight to the bucket.
    pub async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::PresignFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn download_to_file(
        &self,
        container: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        debug!("⬇️ Downloading s3://{}/{} to {}", container, key, dest.display());

        let output = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    StorageError::NotFound {
                        container: container.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::DownloadFailed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let mut body = output.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("⬇️ Downloaded {} bytes from s3://{}/{}", written, container, key);
        Ok(written)
    }

    async fn upload_file(
        &self,
        container: &str,
        key: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", src.display(), e)))?;

        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        info!("⬆️ Uploaded {} to s3://{}/{}", src.display(), container, key);
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;

        info!("🗑️ Deleted s3://{}/{}", container, key);
        Ok(())
    }
}
