//! Consumer configuration (`[consumer]` section)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stream consumer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed delay before reconnecting
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Capacity of the handle's event queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_reconnect_delay_secs() -> u64 {
    3
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ConsumerConfig {
    /// Default configuration pointed at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the reconnect delay
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_secs = delay.as_secs();
        self
    }

    /// Reconnect delay as a `Duration`
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig {
                field: "consumer.base_url".to_string(),
                message: format!("expected an http(s) URL, got {:?}", self.base_url),
            });
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig {
                field: "consumer.queue_capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
