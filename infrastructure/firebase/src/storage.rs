use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use business::domain::errors::StorageError;
use business::domain::logger::Logger;
use business::domain::product::services::ImageStorage;
use business::domain::product::value_objects::ImageFile;

use crate::client::FirebaseClient;
use crate::status::storage_delete_error;

#[derive(Deserialize)]
struct UploadResponse {
    name: String,
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

pub struct ImageStorageFirebase {
    client: Arc<FirebaseClient>,
    logger: Arc<dyn Logger>,
}

impl ImageStorageFirebase {
    pub fn new(client: Arc<FirebaseClient>, logger: Arc<dyn Logger>) -> Self {
        Self { client, logger }
    }

    /// Object name a download URL of this bucket points at.
    pub fn object_path_from_url(&self, image_url: &str) -> Result<String, StorageError> {
        let prefix = format!("{}/", self.client.objects_url());
        let encoded = image_url
            .strip_prefix(&prefix)
            .ok_or(StorageError::InvalidUrl)?;
        let encoded = encoded.split(['?', '#']).next().unwrap_or_default();
        if encoded.is_empty() {
            return Err(StorageError::InvalidUrl);
        }
        urlencoding::decode(encoded)
            .map(|path| path.into_owned())
            .map_err(|_| StorageError::InvalidUrl)
    }
}

#[async_trait]
impl ImageStorage for ImageStorageFirebase {
    async fn upload(&self, object_path: &str, image: &ImageFile) -> Result<String, StorageError> {
        let request = self
            .client
            .client
            .post(self.client.objects_url())
            .query(&[("uploadType", "media"), ("name", object_path)])
            .header("Content-Type", image.content_type.as_str())
            .body(image.bytes.clone());
        let response = self
            .client
            .timed(self.client.with_storage_auth(request))
            .send()
            .await
            .map_err(|err| {
                self.logger.error(&format!("Image upload failed: {}", err));
                StorageError::UploadFailed
            })?;

        if !response.status().is_success() {
            self.logger.error(&format!(
                "Image upload rejected with status {}",
                response.status()
            ));
            return Err(StorageError::UploadFailed);
        }

        let uploaded: UploadResponse = response.json().await.map_err(|err| {
            self.logger
                .error(&format!("Unexpected upload response: {}", err));
            StorageError::UploadFailed
        })?;
        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next());

        Ok(self.client.download_url(&uploaded.name, token))
    }

    async fn delete(&self, image_url: &str) -> Result<(), StorageError> {
        let object_path = self.object_path_from_url(image_url)?;
        let request = self
            .client
            .client
            .delete(self.client.object_url(&object_path));
        let response = self
            .client
            .timed(self.client.with_storage_auth(request))
            .send()
            .await
            .map_err(|err| {
                self.logger.error(&format!("Image delete failed: {}", err));
                StorageError::DeleteFailed
            })?;

        if !response.status().is_success() {
            return Err(storage_delete_error(response.status()));
        }
        self.logger
            .info(&format!("Deleted image {}", object_path));
        Ok(())
    }
}
