//! Error handling for REST API
//!
//! Provides the `AppError` type returned by every handler. Client-facing
//! messages stay generic; internal causes are only logged.

use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    Json,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                // SECURITY: Log full details server-side, return generic message to client
                tracing::error!(details = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName => AppError::BadRequest("Invalid filename".into()),
            StorageError::AlreadyExists => AppError::Conflict("File already exists".into()),
            StorageError::NotFound => AppError::NotFound("File Not Found".into()),
            StorageError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_status() {
        let cases = [
            (StorageError::InvalidName, StatusCode::BAD_REQUEST),
            (StorageError::AlreadyExists, StatusCode::CONFLICT),
            (StorageError::NotFound, StatusCode::NOT_FOUND),
            (
                StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal("/srv/secret/path: permission denied".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("Internal Server Error"));
    }
}
