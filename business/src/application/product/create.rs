use std::sync::Arc;

use async_trait::async_trait;

use crate::application::product::image_upload::ImageUploader;
use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::model::{DetailsProps, ProductDetails, ProductDraft};
use crate::domain::product::repository::ProductRepository;
use crate::domain::product::use_cases::create::{CreateProductParams, CreateProductUseCase};
use crate::domain::product::use_cases::progress::{NoProgress, WriteProgress};
use crate::domain::product::value_objects::ProductId;

pub struct CreateProductUseCaseImpl {
    pub repository: Arc<dyn ProductRepository>,
    pub uploader: Arc<ImageUploader>,
    pub logger: Arc<dyn Logger>,
}

#[async_trait]
impl CreateProductUseCase for CreateProductUseCaseImpl {
    async fn execute(&self, params: CreateProductParams) -> Result<ProductId, ProductError> {
        self.execute_with_progress(params, &NoProgress).await
    }

    async fn execute_with_progress(
        &self,
        params: CreateProductParams,
        progress: &dyn WriteProgress,
    ) -> Result<ProductId, ProductError> {
        self.logger
            .info(&format!("Creating product: {}", params.name_th));

        let details = ProductDetails::new(DetailsProps {
            name_th: params.name_th,
            name_en: params.name_en,
            name_mm: params.name_mm,
            name_cn: params.name_cn,
            price: params.price,
        })?;
        let image = params.image.ok_or(ProductError::ImageMissing)?;

        progress.uploading();
        let image_url = self.uploader.upload(image).await?;
        let draft = ProductDraft { details, image_url };

        progress.writing();
        match self.repository.create(&draft).await {
            Ok(id) => {
                self.logger
                    .info(&format!("Product created with id: {}", id));
                Ok(id)
            }
            Err(err) => {
                self.logger
                    .error(&format!("Failed to write product record: {}", err));
                self.uploader.discard(&draft.image_url).await;
                Err(err.into())
            }
        }
    }
}
