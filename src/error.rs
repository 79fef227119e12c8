//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror. Remote and serialization
//! errors are absorbed by the cache client; they only surface from adapters
//! and from the admin HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache subsystem.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Remote store call failed (timeout, connection, backend error)
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Remote(e.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(e: reqwest::Error) -> Self {
        CacheError::Remote(e.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Remote(_) => StatusCode::BAD_GATEWAY,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_is_bad_request() {
        let response = CacheError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_remote_error_is_bad_gateway() {
        let response = CacheError::Remote("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_serialization_error_from_serde() {
        let err: CacheError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_redis_error_becomes_remote() {
        let err: CacheError = redis::Client::open("not a url").unwrap_err().into();
        assert!(matches!(err, CacheError::Remote(_)));
    }
}
