//! HTTP API
//!
//! - `health`: liveness endpoint
//! - `channels`: channel listing, producer ingest and the live event stream

pub mod channels;
pub mod health;

pub use channels::channel_routes;
pub use health::health_routes;

use serde::Serialize;

/// Standard JSON envelope for non-stream endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
