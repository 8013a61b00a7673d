use std::path::Path;

use async_trait::async_trait;

use crate::common::error::StorageError;

pub mod s3;

/// Blob storage addressed by (container, key).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streams the object into `dest`, creating or truncating it.
    async fn download_to_file(&self, container: &str, key: &str, dest: &Path)
        -> Result<u64, StorageError>;

    async fn upload_file(
        &self,
        container: &str,
        key: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    async fn delete_object(&self, container: &str, key: &str) -> Result<(), StorageError>;
}
