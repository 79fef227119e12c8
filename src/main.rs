//! Tiercache - two-tier cache over a remote key-value store
//!
//! Composition root: builds the single process-wide cache client and manager
//! and serves the admin HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiercache::api::create_router;
use tiercache::remote::Backend;
use tiercache::{AppState, CacheClient, ClientSettings, Config, DomainCacheManager};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the configured remote store (local-only on failure)
/// 4. Create the cache client and start its sweep task
/// 5. Serve the admin router on the configured port
/// 6. On SIGINT/SIGTERM, stop the server and flush pending writes
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiercache");

    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        sweep_interval_s = config.sweep_interval,
        flush_debounce_ms = config.flush_debounce_ms,
        port = config.server_port,
        "Configuration loaded"
    );

    let backend = match Backend::connect(&config.remote()).await {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "Remote store unavailable, running local-only");
            Backend::NoBackend
        }
    };

    let client = Arc::new(CacheClient::new(
        ClientSettings::from_config(&config),
        backend.into_store(),
    ));
    client.start();
    info!(backend = client.backend_kind(), "Cache client started");

    let manager = Arc::new(DomainCacheManager::new(client.clone(), &config));
    let app = create_router(AppState::new(manager));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Admin server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("admin server failed")?;

    client.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
