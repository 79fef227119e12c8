//! API Module
//!
//! Admin HTTP surface over the process-wide cache manager.
//!
//! # Endpoints
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `POST /flush` - Flush pending writes
//! - `POST /invalidate` - Delete exact keys
//! - `DELETE /local` - Clear the local cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
