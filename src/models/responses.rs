//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

/// Response body for POST /flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// Writes accepted by the remote store
    pub flushed: usize,
}

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Keys reported deleted
    pub deleted: u64,
}

/// Response body for DELETE /local
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Local cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Remote backend in use ("none" in local-only mode)
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
