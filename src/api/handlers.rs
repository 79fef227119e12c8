//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::cache::CacheStatistics;
use crate::error::{CacheError, Result};
use crate::manager::DomainCacheManager;
use crate::models::{
    ClearResponse, FlushResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide cache manager built by the composition root
    pub manager: Arc<DomainCacheManager>,
}

impl AppState {
    pub fn new(manager: Arc<DomainCacheManager>) -> Self {
        Self { manager }
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.manager.client().backend_kind()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStatistics> {
    Json(state.manager.statistics())
}

/// Handler for POST /flush
///
/// Sends pending writes to the remote store without waiting for the debounce window.
pub async fn flush_handler(State(state): State<AppState>) -> Json<FlushResponse> {
    let flushed = state.manager.flush().await;
    Json(FlushResponse { flushed })
}

/// Handler for POST /invalidate
///
/// Deletes exact keys; wildcard patterns are rejected.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let deleted = state.manager.invalidate(&req.keys).await;
    Ok(Json(InvalidateResponse { deleted }))
}

/// Handler for DELETE /local
///
/// Clears the local cache and statistics; the remote store is untouched.
pub async fn clear_local_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.manager.clear_local_cache();
    Json(ClearResponse::new())
}
