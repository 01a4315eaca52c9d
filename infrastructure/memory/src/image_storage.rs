use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use business::domain::errors::StorageError;
use business::domain::product::services::ImageStorage;
use business::domain::product::value_objects::ImageFile;

pub const URL_SCHEME: &str = "memory://";

/// Object storage kept in process memory. Download URLs have the form
/// `memory://{object_path}`.
#[derive(Default)]
pub struct InMemoryImageStorage {
    objects: Mutex<HashMap<String, ImageFile>>,
}

impl InMemoryImageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, image_url: &str) -> bool {
        match image_url.strip_prefix(URL_SCHEME) {
            Some(path) => self.objects.lock().await.contains_key(path),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ImageStorage for InMemoryImageStorage {
    async fn upload(&self, object_path: &str, image: &ImageFile) -> Result<String, StorageError> {
        if object_path.is_empty() {
            return Err(StorageError::UploadFailed);
        }
        self.objects
            .lock()
            .await
            .insert(object_path.to_string(), image.clone());
        Ok(format!("{URL_SCHEME}{object_path}"))
    }

    async fn delete(&self, image_url: &str) -> Result<(), StorageError> {
        let path = image_url
            .strip_prefix(URL_SCHEME)
            .ok_or(StorageError::InvalidUrl)?;
        self.objects
            .lock()
            .await
            .remove(path)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageFile {
        ImageFile::new("a.png", "image/png", vec![1, 2])
    }

    #[tokio::test]
    async fn should_store_and_delete_object() {
        let storage = InMemoryImageStorage::new();

        let url = storage.upload("products/a.png", &image()).await.unwrap();

        assert_eq!(url, "memory://products/a.png");
        assert!(storage.contains(&url).await);
        storage.delete(&url).await.unwrap();
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn should_report_missing_and_foreign_urls() {
        let storage = InMemoryImageStorage::new();

        assert!(matches!(
            storage.delete("memory://products/none.png").await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            storage.delete("https://example.com/a.png").await,
            Err(StorageError::InvalidUrl)
        ));
    }
}
