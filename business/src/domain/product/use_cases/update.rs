use async_trait::async_trait;

use crate::domain::product::errors::ProductError;
use crate::domain::product::model::Product;
use crate::domain::product::use_cases::progress::WriteProgress;
use crate::domain::product::value_objects::{ImageFile, ProductId};

pub struct UpdateProductParams {
    pub id: ProductId,
    pub name_th: String,
    pub name_en: Option<String>,
    pub name_mm: Option<String>,
    pub name_cn: Option<String>,
    pub price: String,
    /// A replacement image. `None` keeps the current one.
    pub image: Option<ImageFile>,
}

#[async_trait]
pub trait UpdateProductUseCase: Send + Sync {
    async fn execute(&self, params: UpdateProductParams) -> Result<Product, ProductError>;

    /// Same as [`execute`](Self::execute), reporting each stage to `progress`.
    async fn execute_with_progress(
        &self,
        params: UpdateProductParams,
        _progress: &dyn WriteProgress,
    ) -> Result<Product, ProductError> {
        self.execute(params).await
    }
}
