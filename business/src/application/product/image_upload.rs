use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::StorageError;
use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::services::{CompressionOptions, ImageCompressor, ImageStorage};
use crate::domain::product::value_objects::ImageFile;

/// Storage folder holding product images.
pub const IMAGE_FOLDER: &str = "products";

/// Compress-then-upload step shared by the create and update flows.
pub struct ImageUploader {
    pub compressor: Arc<dyn ImageCompressor>,
    pub storage: Arc<dyn ImageStorage>,
    pub options: CompressionOptions,
    pub logger: Arc<dyn Logger>,
}

impl ImageUploader {
    /// Fresh random object path keeping the image's extension.
    pub fn object_path(image: &ImageFile) -> String {
        let key = Uuid::new_v4();
        match image.extension() {
            Some(ext) => format!("{IMAGE_FOLDER}/{key}.{ext}"),
            None => format!("{IMAGE_FOLDER}/{key}"),
        }
    }

    pub async fn upload(&self, image: ImageFile) -> Result<String, ProductError> {
        let original_size = image.size();

        let compressed = self.compressor.compress(image, &self.options).await?;
        let object_path = Self::object_path(&compressed);
        self.logger.debug(&format!(
            "Compressed image from {} KB to {} KB",
            original_size / 1024,
            compressed.size() / 1024
        ));

        let url = self.storage.upload(&object_path, &compressed).await?;
        self.logger
            .info(&format!("Uploaded image to {}", object_path));
        Ok(url)
    }

    /// Best-effort removal. Returns false when the object is left behind.
    pub async fn discard(&self, image_url: &str) -> bool {
        match self.storage.delete(image_url).await {
            Ok(()) => true,
            Err(StorageError::NotFound) => {
                self.logger
                    .debug(&format!("Image already absent: {}", image_url));
                true
            }
            Err(err) => {
                self.logger
                    .warn(&format!("Orphaned image left in storage: {} ({})", image_url, err));
                false
            }
        }
    }
}
