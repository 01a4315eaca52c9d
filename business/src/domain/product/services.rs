use async_trait::async_trait;

use crate::domain::errors::StorageError;

use super::value_objects::ImageFile;

/// Bounds applied to an image before it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOptions {
    pub max_size_bytes: usize,
    pub max_dimension: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: 1024 * 1024,
            max_dimension: 800,
        }
    }
}

/// Service port for shrinking images before upload.
#[async_trait]
pub trait ImageCompressor: Send + Sync {
    async fn compress(
        &self,
        image: ImageFile,
        options: &CompressionOptions,
    ) -> Result<ImageFile, StorageError>;
}

/// Service port for the hosted object storage.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Stores `image` under `object_path` and returns its durable download URL.
    async fn upload(&self, object_path: &str, image: &ImageFile) -> Result<String, StorageError>;

    /// Removes the object a download URL points at.
    async fn delete(&self, image_url: &str) -> Result<(), StorageError>;
}
