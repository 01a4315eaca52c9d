/// Repository errors for domain layer.
/// Use code-style identifiers for all error variants for i18n compatibility.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository.not_found")]
    NotFound,
    #[error("repository.persistence")]
    Persistence,
    #[error("repository.unauthorized")]
    Unauthorized,
    #[error("repository.transport")]
    Transport,
    #[error("repository.corrupted_record")]
    CorruptedRecord,
}

impl RepositoryError {
    pub fn not_found() -> Self {
        RepositoryError::NotFound
    }
    pub fn persistence() -> Self {
        RepositoryError::Persistence
    }
    pub fn transport() -> Self {
        RepositoryError::Transport
    }
}

/// Object storage errors (image upload, deletion and compression).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage.upload_failed")]
    UploadFailed,
    #[error("storage.delete_failed")]
    DeleteFailed,
    #[error("storage.not_found")]
    NotFound,
    #[error("storage.invalid_url")]
    InvalidUrl,
    #[error("storage.image_too_large")]
    ImageTooLarge,
    #[error("storage.unsupported_image")]
    UnsupportedImage,
}
