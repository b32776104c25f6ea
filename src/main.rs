//! Ymir Image Cache - sample application
//!
//! Composes an in-memory data source with the image cache and serves the
//! cache over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ymir_image_cache::api::create_router;
use ymir_image_cache::metadata::EntityMetadata;
use ymir_image_cache::{spawn_attach, AppState, Config, MemoryDataSource};

/// Main entry point for the sample application.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load entity metadata and create the data source
/// 4. Create the image cache and queue its attachment
/// 5. Start the data source, releasing the pending attachment
/// 6. Serve the HTTP API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ymir_image_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ymir image cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_cache_bytes={}, port={}, metadata={:?}",
        config.max_cache_bytes, config.server_port, config.metadata_path
    );

    let metadata = match &config.metadata_path {
        Some(path) => EntityMetadata::from_file(path),
        None => EntityMetadata::sample(),
    }
    .context("Failed to load entity metadata")?;
    let source = Arc::new(MemoryDataSource::new(metadata));

    let state = AppState::from_config(&config, source.clone());
    let attach_handle = spawn_attach(state.cache.clone(), source.clone());

    source.start();
    attach_handle
        .await
        .context("Attach task panicked")?
        .context("Failed to attach image cache")?;

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.cache.detach(&*source);
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
