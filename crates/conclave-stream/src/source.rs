//! Byte sources for the consumer.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{Error, Result};

/// Chunked body of one connection
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Opens a fresh byte stream for a channel.
///
/// Called once per connection attempt; every reconnect asks for a new stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Connect to `channel_id` and return its body stream.
    async fn connect(&self, channel_id: &str) -> Result<ByteStream>;
}

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// [`ByteSource`] over HTTP: `GET {base}/api/v1/channels/{id}/stream`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Create a source for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        // No overall request timeout: the body is expected to stay open
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Self::with_client(client, base_url)
    }

    /// Create a source with a preconfigured client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| invalid_base_url(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_base_url(format!("{base_url} cannot carry a path")));
        }
        Ok(Self { client, base_url })
    }

    /// Stream URL for a channel. The id is percent-encoded as one path
    /// segment, so reserved characters stay part of the id.
    pub fn stream_url(&self, channel_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| invalid_base_url(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "channels", channel_id, "stream"]);
        Ok(url)
    }
}

fn invalid_base_url(message: String) -> Error {
    Error::InvalidConfig {
        field: "base_url".to_string(),
        message,
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn connect(&self, channel_id: &str) -> Result<ByteStream> {
        let url = self.stream_url(channel_id)?;
        debug!(url = %url, "Opening event stream");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("{url} returned {status}")));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .boxed())
    }
}
