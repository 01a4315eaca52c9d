use std::sync::Arc;

use async_trait::async_trait;

use crate::application::product::image_upload::ImageUploader;
use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::model::{DetailsProps, Product, ProductDetails, ProductPatch};
use crate::domain::product::repository::ProductRepository;
use crate::domain::product::use_cases::progress::{NoProgress, WriteProgress};
use crate::domain::product::use_cases::update::{UpdateProductParams, UpdateProductUseCase};

pub struct UpdateProductUseCaseImpl {
    pub repository: Arc<dyn ProductRepository>,
    pub uploader: Arc<ImageUploader>,
    pub logger: Arc<dyn Logger>,
}

#[async_trait]
impl UpdateProductUseCase for UpdateProductUseCaseImpl {
    async fn execute(&self, params: UpdateProductParams) -> Result<Product, ProductError> {
        self.execute_with_progress(params, &NoProgress).await
    }

    async fn execute_with_progress(
        &self,
        params: UpdateProductParams,
        progress: &dyn WriteProgress,
    ) -> Result<Product, ProductError> {
        self.logger
            .info(&format!("Updating product: {}", params.id));

        let details = ProductDetails::new(DetailsProps {
            name_th: params.name_th,
            name_en: params.name_en,
            name_mm: params.name_mm,
            name_cn: params.name_cn,
            price: params.price,
        })?;

        // Verify product exists
        let existing = self
            .repository
            .get_by_id(&params.id)
            .await
            .map_err(ProductError::from_lookup)?;

        let new_image_url = match params.image {
            Some(image) => {
                progress.uploading();
                Some(self.uploader.upload(image).await?)
            }
            None => None,
        };

        let patch = ProductPatch {
            details,
            image_url: new_image_url,
        };

        progress.writing();
        if let Err(err) = self.repository.update(&params.id, &patch).await {
            self.logger
                .error(&format!("Failed to patch product {}: {}", params.id, err));
            if let Some(url) = &patch.image_url {
                self.uploader.discard(url).await;
            }
            return Err(err.into());
        }

        if let Some(new_url) = &patch.image_url
            && *new_url != existing.image_url
        {
            self.uploader.discard(&existing.image_url).await;
        }

        let details = patch.details;
        let updated = Product {
            id: existing.id,
            name_th: details.name_th,
            name_en: details.name_en.or(existing.name_en),
            name_mm: details.name_mm.or(existing.name_mm),
            name_cn: details.name_cn.or(existing.name_cn),
            price: details.price,
            image_url: patch.image_url.unwrap_or(existing.image_url),
            created_at: existing.created_at,
        };

        self.logger.info(&format!("Product updated: {}", updated.id));
        Ok(updated)
    }
}
