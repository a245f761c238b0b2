//! Broker and transport configuration
//!
//! Both structs deserialize from the `[broker]` and `[transport]` sections of
//! the application config; every field has a default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Channel registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Events retained per channel (ring buffer capacity)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Events replayed to a newly joined subscriber
    #[serde(default = "default_replay_count")]
    pub replay_count: usize,
    /// Seconds a channel may stay without subscribers before it is removed
    #[serde(default = "default_cleanup_grace_secs")]
    pub cleanup_grace_secs: u64,
}

fn default_history_capacity() -> usize {
    100
}
fn default_replay_count() -> usize {
    10
}
fn default_cleanup_grace_secs() -> u64 {
    60
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            replay_count: default_replay_count(),
            cleanup_grace_secs: default_cleanup_grace_secs(),
        }
    }
}

impl BrokerConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history capacity
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the replay count
    #[must_use]
    pub fn with_replay_count(mut self, count: usize) -> Self {
        self.replay_count = count;
        self
    }

    /// Set the cleanup grace period
    #[must_use]
    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace_secs = grace.as_secs();
        self
    }

    /// Grace period as a `Duration`
    #[must_use]
    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.cleanup_grace_secs)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::InvalidConfig {
                field: "broker.history_capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.replay_count > self.history_capacity {
            return Err(Error::InvalidConfig {
                field: "broker.replay_count".to_string(),
                message: format!(
                    "must not exceed history_capacity ({})",
                    self.history_capacity
                ),
            });
        }
        Ok(())
    }
}

/// Push transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Idle seconds before a keep-alive comment frame is written
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Per-connection outbound queue size
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_keep_alive_secs() -> u64 {
    30
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl TransportConfig {
    /// Keep-alive interval as a `Duration`
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Validate value ranges.
    ///
    /// The queue must hold the connect notice plus a full replay backlog,
    /// otherwise a new connection would fail during its own replay.
    pub fn validate(&self, broker: &BrokerConfig) -> Result<()> {
        if self.keep_alive_secs == 0 {
            return Err(Error::InvalidConfig {
                field: "transport.keep_alive_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.queue_capacity <= broker.replay_count {
            return Err(Error::InvalidConfig {
                field: "transport.queue_capacity".to_string(),
                message: format!("must exceed broker.replay_count ({})", broker.replay_count),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let broker = BrokerConfig::default();
        assert_eq!(broker.history_capacity, 100);
        assert_eq!(broker.replay_count, 10);
        assert_eq!(broker.cleanup_grace(), Duration::from_secs(60));

        let transport = TransportConfig::default();
        assert_eq!(transport.keep_alive(), Duration::from_secs(30));
        assert!(transport.validate(&broker).is_ok());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let broker: BrokerConfig = serde_json::from_str(r#"{"replay_count": 5}"#).unwrap();
        assert_eq!(broker.replay_count, 5);
        assert_eq!(broker.history_capacity, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(BrokerConfig::new().with_history_capacity(0).validate().is_err());
        assert!(BrokerConfig::new()
            .with_history_capacity(5)
            .with_replay_count(6)
            .validate()
            .is_err());

        let transport = TransportConfig {
            keep_alive_secs: 30,
            queue_capacity: 10,
        };
        assert!(transport.validate(&BrokerConfig::default()).is_err());
    }
}
