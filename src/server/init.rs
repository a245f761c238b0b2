//! Server initialization and main run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::shutdown::wait_for_shutdown_signal;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use conclave_core::{ChannelRegistry, TransportConfig};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Build the HTTP router around a registry
pub fn build_router(registry: Arc<ChannelRegistry>, transport: TransportConfig) -> Router {
    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::channel_routes())
        .route("/", get(|| async { "Conclave live progress server" }))
        .layer(Extension(registry))
        .layer(Extension(transport))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Conclave v{}", env!("CARGO_PKG_VERSION"));

    let config: AppConfig = load_config().context("Failed to load configuration")?;
    info!(
        history_capacity = config.broker.history_capacity,
        replay_count = config.broker.replay_count,
        cleanup_grace_secs = config.broker.cleanup_grace_secs,
        keep_alive_secs = config.transport.keep_alive_secs,
        "Configuration loaded"
    );

    let registry = ChannelRegistry::new(config.broker.clone());
    let app = build_router(registry.clone(), config.transport.clone());

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    // Open event streams never end on their own; closing the registry ends
    // them so graceful shutdown can drain connections.
    let shutdown_registry = registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            shutdown_registry.close();
        })
        .await
        .context("HTTP server error")?;

    registry.close();

    info!("Conclave shutdown complete");
    Ok(())
}
