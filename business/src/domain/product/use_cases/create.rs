use async_trait::async_trait;

use crate::domain::product::errors::ProductError;
use crate::domain::product::use_cases::progress::WriteProgress;
use crate::domain::product::value_objects::{ImageFile, ProductId};

pub struct CreateProductParams {
    pub name_th: String,
    pub name_en: Option<String>,
    pub name_mm: Option<String>,
    pub name_cn: Option<String>,
    /// Raw price input.
    pub price: String,
    pub image: Option<ImageFile>,
}

#[async_trait]
pub trait CreateProductUseCase: Send + Sync {
    async fn execute(&self, params: CreateProductParams) -> Result<ProductId, ProductError>;

    /// Same as [`execute`](Self::execute), reporting each stage to `progress`.
    async fn execute_with_progress(
        &self,
        params: CreateProductParams,
        _progress: &dyn WriteProgress,
    ) -> Result<ProductId, ProductError> {
        self.execute(params).await
    }
}
