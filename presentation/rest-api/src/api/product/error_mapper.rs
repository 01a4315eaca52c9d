use poem::http::StatusCode;
use poem_openapi::payload::Json;

use business::application::product::form::FormError;
use business::domain::errors::StorageError;
use business::domain::product::errors::ProductError;

use crate::api::error::{ErrorResponse, IntoErrorResponse};

impl IntoErrorResponse for ProductError {
    fn into_error_response(self) -> (StatusCode, Json<ErrorResponse>) {
        let (status, name) = match &self {
            err if err.is_validation() => (StatusCode::BAD_REQUEST, "ValidationError"),
            ProductError::Upload(StorageError::ImageTooLarge | StorageError::UnsupportedImage) => {
                (StatusCode::BAD_REQUEST, "ValidationError")
            }
            ProductError::NotFound => (StatusCode::NOT_FOUND, "NotFound"),
            ProductError::Upload(_) => (StatusCode::BAD_GATEWAY, "UploadError"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let message = match &self {
            ProductError::Upload(storage) => storage.to_string(),
            ProductError::Repository(repository) => repository.to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(name, &message)))
    }
}

impl IntoErrorResponse for FormError {
    fn into_error_response(self) -> (StatusCode, Json<ErrorResponse>) {
        match self {
            FormError::Busy => (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("Conflict", "form.busy")),
            ),
            FormError::Product(err) => err.into_error_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use business::domain::errors::RepositoryError;

    fn status_and_name(err: ProductError) -> (u16, String, String) {
        let (status, json) = err.into_error_response();
        (status.as_u16(), json.0.name, json.0.message)
    }

    #[test]
    fn should_map_validation_errors_to_bad_request() {
        assert_eq!(
            status_and_name(ProductError::PriceInvalid),
            (400, "ValidationError".to_string(), "product.price_invalid".to_string())
        );
        assert_eq!(
            status_and_name(ProductError::Upload(StorageError::ImageTooLarge)).0,
            400
        );
    }

    #[test]
    fn should_map_upload_failure_to_bad_gateway() {
        assert_eq!(
            status_and_name(ProductError::Upload(StorageError::UploadFailed)),
            (502, "UploadError".to_string(), "storage.upload_failed".to_string())
        );
    }

    #[test]
    fn should_map_repository_errors_to_internal_error() {
        assert_eq!(
            status_and_name(ProductError::Repository(RepositoryError::Unauthorized)),
            (500, "InternalError".to_string(), "repository.unauthorized".to_string())
        );
        assert_eq!(status_and_name(ProductError::NotFound).0, 404);
    }

    #[test]
    fn should_map_busy_form_to_conflict() {
        let (status, json) = FormError::Busy.into_error_response();

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json.0.message, "form.busy");
    }
}
