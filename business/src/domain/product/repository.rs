use async_trait::async_trait;

use crate::domain::errors::RepositoryError;

use super::model::{Product, ProductDraft, ProductPatch};
use super::subscription::SnapshotSubscription;
use super::value_objects::ProductId;

/// Port to the remote `products` collection.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Opens a live feed that delivers the full collection on every change,
    /// starting with its current state.
    async fn subscribe(&self) -> Result<SnapshotSubscription, RepositoryError>;
    async fn get_by_id(&self, id: &ProductId) -> Result<Product, RepositoryError>;
    /// Appends a new record with a store-set creation timestamp.
    async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError>;
    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError>;
}
