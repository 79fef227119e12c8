//! API Routes
//!
//! Configures the Axum router with the cache admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_local_handler, flush_handler, health_handler, invalidate_handler, stats_handler,
    AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check with backend kind
/// - `GET /stats` - Cache statistics
/// - `POST /flush` - Flush pending writes now
/// - `POST /invalidate` - Delete exact keys
/// - `DELETE /local` - Clear the local cache
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/flush", post(flush_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/local", delete(clear_local_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
