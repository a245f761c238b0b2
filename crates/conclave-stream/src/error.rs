//! Error types for conclave-stream

use thiserror::Error;

use crate::frame::FrameError;

/// Stream consumer error type
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed or the server answered with an error status
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A frame could not be decoded
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
