//! Error types for the image cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the image cache and its sample server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A single-image read hit an array slot, or the other way around
    #[error("Type mismatch for {key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Entity metadata could not be read or parsed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::TypeMismatch { .. } => StatusCode::CONFLICT,
            CacheError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the image cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = CacheError::TypeMismatch {
            key: "Product:1:photo".to_string(),
            expected: "image array",
            found: "image",
        };
        let msg = err.to_string();
        assert!(msg.contains("Product:1:photo"));
        assert!(msg.contains("expected image array"));
    }

    #[test]
    fn test_status_codes() {
        let mismatch = CacheError::TypeMismatch {
            key: "k".to_string(),
            expected: "image",
            found: "image array",
        };
        assert_eq!(mismatch.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            CacheError::NotFound("k".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheError::InvalidRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CacheError::Configuration("broken".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
