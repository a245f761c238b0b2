//! Error types for conclave-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Event could not be serialized to its wire form
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delivery to a subscriber failed
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// The registry has been closed and accepts no more work
    #[error("channel registry is closed")]
    RegistryClosed,

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

/// Why a subscriber's `deliver` callback failed.
///
/// Any of these marks the subscriber as dead; the registry removes it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's outbound queue is full (slow consumer)
    #[error("subscriber queue is full")]
    QueueFull,

    /// The subscriber's connection is gone
    #[error("subscriber connection closed")]
    Closed,

    /// The callback panicked
    #[error("subscriber callback panicked")]
    Panicked,

    /// Any other callback-reported failure
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let error = Error::InvalidConfig {
            field: "broker.history_capacity".to_string(),
            message: "must be positive".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("broker.history_capacity"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_delivery_error_converts() {
        let error: Error = DeliveryError::QueueFull.into();
        assert_eq!(error.to_string(), "delivery error: subscriber queue is full");
    }
}
