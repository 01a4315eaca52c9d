use std::sync::Arc;

use async_trait::async_trait;

use crate::application::product::image_upload::ImageUploader;
use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::repository::ProductRepository;
use crate::domain::product::use_cases::delete::{
    DeleteOutcome, DeleteProductParams, DeleteProductUseCase,
};

/// Removes the record first, then its image. A failure between the two
/// steps leaves an unreferenced image in storage, never a record pointing
/// at a missing image.
pub struct DeleteProductUseCaseImpl {
    pub repository: Arc<dyn ProductRepository>,
    pub uploader: Arc<ImageUploader>,
    pub logger: Arc<dyn Logger>,
}

#[async_trait]
impl DeleteProductUseCase for DeleteProductUseCaseImpl {
    async fn execute(&self, params: DeleteProductParams) -> Result<DeleteOutcome, ProductError> {
        self.logger
            .info(&format!("Deleting product: {}", params.id));

        let existing = self
            .repository
            .get_by_id(&params.id)
            .await
            .map_err(ProductError::from_lookup)?;

        self.repository.delete(&params.id).await?;

        let image_removed = self.uploader.discard(&existing.image_url).await;

        self.logger.info(&format!("Product deleted: {}", params.id));
        Ok(DeleteOutcome { image_removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{RepositoryError, StorageError};
    use crate::domain::product::model::{Product, ProductDraft, ProductPatch};
    use crate::domain::product::services::{CompressionOptions, ImageCompressor, ImageStorage};
    use crate::domain::product::subscription::SnapshotSubscription;
    use crate::domain::product::value_objects::{ImageFile, Price, ProductId};
    use mockall::mock;

    mock! {
        pub ProductRepo {}

        #[async_trait]
        impl ProductRepository for ProductRepo {
            async fn subscribe(&self) -> Result<SnapshotSubscription, RepositoryError>;
            async fn get_by_id(&self, id: &ProductId) -> Result<Product, RepositoryError>;
            async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError>;
            async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError>;
            async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        pub Compressor {}

        #[async_trait]
        impl ImageCompressor for Compressor {
            async fn compress(
                &self,
                image: ImageFile,
                options: &CompressionOptions,
            ) -> Result<ImageFile, StorageError>;
        }
    }

    mock! {
        pub Storage {}

        #[async_trait]
        impl ImageStorage for Storage {
            async fn upload(&self, object_path: &str, image: &ImageFile) -> Result<String, StorageError>;
            async fn delete(&self, image_url: &str) -> Result<(), StorageError>;
        }
    }

    mock! {
        pub Log {}

        impl Logger for Log {
            fn info(&self, message: &str);
            fn warn(&self, message: &str);
            fn error(&self, message: &str);
            fn debug(&self, message: &str);
        }
    }

    fn mock_logger() -> Arc<dyn Logger> {
        let mut logger = MockLog::new();
        logger.expect_info().returning(|_| ());
        logger.expect_warn().returning(|_| ());
        logger.expect_error().returning(|_| ());
        logger.expect_debug().returning(|_| ());
        Arc::new(logger)
    }

    fn use_case(repo: MockProductRepo, storage: MockStorage) -> DeleteProductUseCaseImpl {
        DeleteProductUseCaseImpl {
            repository: Arc::new(repo),
            uploader: Arc::new(ImageUploader {
                compressor: Arc::new(MockCompressor::new()),
                storage: Arc::new(storage),
                options: CompressionOptions::default(),
                logger: mock_logger(),
            }),
            logger: mock_logger(),
        }
    }

    fn stored_product() -> Product {
        Product {
            id: ProductId::new("-Nabc"),
            name_th: "ส้ม".to_string(),
            name_en: None,
            name_mm: None,
            name_cn: None,
            price: Price::new(25.0).unwrap(),
            image_url: "https://storage/products/a.jpg".to_string(),
            created_at: None,
        }
    }

    fn params() -> DeleteProductParams {
        DeleteProductParams {
            id: ProductId::new("-Nabc"),
        }
    }

    #[tokio::test]
    async fn should_delete_record_then_image() {
        let mut repo = MockProductRepo::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(stored_product()));
        repo.expect_delete().times(1).returning(|_| Ok(()));
        let mut storage = MockStorage::new();
        storage
            .expect_delete()
            .withf(|url| url == "https://storage/products/a.jpg")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = use_case(repo, storage).execute(params()).await.unwrap();

        assert!(outcome.image_removed);
    }

    #[tokio::test]
    async fn should_keep_image_when_record_delete_fails() {
        let mut repo = MockProductRepo::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(stored_product()));
        repo.expect_delete()
            .returning(|_| Err(RepositoryError::Persistence));
        let mut storage = MockStorage::new();
        storage.expect_delete().never();

        let result = use_case(repo, storage).execute(params()).await;

        assert!(matches!(
            result.unwrap_err(),
            ProductError::Repository(RepositoryError::Persistence)
        ));
    }

    #[tokio::test]
    async fn should_report_orphaned_image_when_image_delete_fails() {
        let mut repo = MockProductRepo::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(stored_product()));
        repo.expect_delete().returning(|_| Ok(()));
        let mut storage = MockStorage::new();
        storage
            .expect_delete()
            .returning(|_| Err(StorageError::DeleteFailed));

        let outcome = use_case(repo, storage).execute(params()).await.unwrap();

        assert!(!outcome.image_removed);
    }

    #[tokio::test]
    async fn should_return_not_found_when_product_missing() {
        let mut repo = MockProductRepo::new();
        repo.expect_get_by_id()
            .returning(|_| Err(RepositoryError::NotFound));
        repo.expect_delete().never();

        let result = use_case(repo, MockStorage::new()).execute(params()).await;

        assert!(matches!(result.unwrap_err(), ProductError::NotFound));
    }
}
