use reqwest::StatusCode;

use business::domain::errors::{RepositoryError, StorageError};

pub fn repository_error(status: StatusCode) -> RepositoryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::Unauthorized,
        StatusCode::NOT_FOUND => RepositoryError::not_found(),
        _ => RepositoryError::persistence(),
    }
}

pub fn storage_delete_error(status: StatusCode) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        _ => StorageError::DeleteFailed,
    }
}
