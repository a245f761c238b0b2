//! Channel endpoints
//!
//! - `GET  /api/v1/channels` active channels, most recent first
//! - `GET  /api/v1/channels/:channel_id/stream` live `text/event-stream`
//! - `POST /api/v1/channels/:channel_id/events` publish an event kind

use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use conclave_core::{ChannelInfo, ChannelRegistry, EventKind, EventStream, TransportConfig};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ApiResponse;

/// List active channels
async fn list_channels(
    Extension(registry): Extension<Arc<ChannelRegistry>>,
) -> Json<ApiResponse<Vec<ChannelInfo>>> {
    Json(ApiResponse::success(registry.active_channels()))
}

/// Open the live event stream for a channel.
///
/// The response body lives as long as the client connection; dropping it
/// unsubscribes from the registry.
async fn stream_channel(
    Path(channel_id): Path<String>,
    Extension(registry): Extension<Arc<ChannelRegistry>>,
    Extension(transport): Extension<TransportConfig>,
) -> Response {
    match EventStream::open(&registry, &channel_id, &transport) {
        Ok(stream) => (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::HeaderName::from_static("x-accel-buffering"), "no"),
            ],
            Body::from_stream(stream.encoded()),
        )
            .into_response(),
        Err(e) => {
            warn!(channel_id = %channel_id, error = %e, "Event stream rejected");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Publish an event to a channel on behalf of a producer
async fn publish_event(
    Path(channel_id): Path<String>,
    Extension(registry): Extension<Arc<ChannelRegistry>>,
    Json(kind): Json<EventKind>,
) -> Response {
    if registry.is_closed() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error("server is shutting down")),
        )
            .into_response();
    }

    let event = registry.publish_kind(&channel_id, kind);
    debug!(channel_id = %channel_id, event_id = %event.id, kind = event.kind_name(), "Event ingested");
    (StatusCode::ACCEPTED, Json(ApiResponse::success(event))).into_response()
}

/// Create channel routes
pub fn channel_routes() -> Router {
    Router::new()
        .route("/api/v1/channels", get(list_channels))
        .route("/api/v1/channels/:channel_id/stream", get(stream_channel))
        .route("/api/v1/channels/:channel_id/events", post(publish_event))
}
