use async_trait::async_trait;

use crate::domain::product::errors::ProductError;
use crate::domain::product::value_objects::ProductId;

pub struct DeleteProductParams {
    pub id: ProductId,
}

/// Result of a delete. The record is always gone when this is returned;
/// `image_removed` is false when the image object could not be deleted and
/// was left orphaned in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub image_removed: bool,
}

#[async_trait]
pub trait DeleteProductUseCase: Send + Sync {
    async fn execute(&self, params: DeleteProductParams) -> Result<DeleteOutcome, ProductError>;
}
