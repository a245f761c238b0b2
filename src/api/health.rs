//! Health check endpoint

use axum::response::Json;
use axum::routing::get;
use axum::{Extension, Router};
use conclave_core::ChannelRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub channels: usize,
}

/// Simple health check (for load balancers)
async fn health_check(Extension(registry): Extension<Arc<ChannelRegistry>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if registry.is_closed() {
            "shutting_down"
        } else {
            "healthy"
        },
        version: env!("CARGO_PKG_VERSION"),
        channels: registry.channel_count(),
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}
