use crate::domain::errors::{RepositoryError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("product.name_empty")]
    NameEmpty,
    #[error("product.price_empty")]
    PriceEmpty,
    #[error("product.price_invalid")]
    PriceInvalid,
    #[error("product.image_missing")]
    ImageMissing,
    #[error("product.invalid_id")]
    InvalidId,
    #[error("product.not_found")]
    NotFound,
    #[error("product.decode_failed")]
    Decode { key: String, reason: String },
    #[error("product.sync_invalid_transition")]
    InvalidSyncTransition,
    #[error("product.upload_failed")]
    Upload(#[from] StorageError),
    #[error("repository.persistence")]
    Repository(#[from] RepositoryError),
}

impl ProductError {
    /// True for errors raised before any network call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProductError::NameEmpty
                | ProductError::PriceEmpty
                | ProductError::PriceInvalid
                | ProductError::ImageMissing
                | ProductError::InvalidId
        )
    }

    pub(crate) fn from_lookup(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ProductError::NotFound,
            other => ProductError::Repository(other),
        }
    }
}
