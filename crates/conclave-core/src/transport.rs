//! Push transport - turns a channel subscription into a stream of frames.
//!
//! Each frame is one server-sent-event style record:
//!
//! ```text
//! data: {"id":"…","channelId":"proj-1","timestamp":…,"type":"progress","data":{…}}
//!
//! : keep-alive
//!
//! ```
//!
//! An [`EventStream`] owns a bounded queue fed by a registry subscription.
//! The registry never waits on it: when the queue is full the subscriber is
//! dropped and the stream ends once the queued frames are drained.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, Sleep};
use tracing::{debug, info};

use crate::broker::ChannelRegistry;
use crate::config::TransportConfig;
use crate::error::{DeliveryError, Error, Result};
use crate::event::{ChatMessage, Event, EventKind};

/// Field prefix of an event frame
pub const DATA_PREFIX: &str = "data:";

/// Comment frame written when the connection has been idle
pub const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";

/// Encode one event as a `data:` frame terminated by a blank line.
pub fn encode_frame(event: &Event) -> Result<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("{DATA_PREFIX} {json}\n\n"))
}

/// One unit written to the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// An event record
    Event(Event),
    /// Idle keep-alive comment
    KeepAlive,
}

impl Frame {
    /// Wire text of this frame
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::Event(event) => encode_frame(event),
            Self::KeepAlive => Ok(KEEP_ALIVE_FRAME.to_string()),
        }
    }
}

/// Unsubscribes exactly once when dropped.
struct Registration {
    registry: Weak<ChannelRegistry>,
    channel_id: String,
    subscriber_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let attached = self
            .registry
            .upgrade()
            .map(|registry| registry.unsubscribe(&self.channel_id, &self.subscriber_id))
            .unwrap_or(false);
        debug!(
            channel_id = %self.channel_id,
            subscriber_id = %self.subscriber_id,
            attached,
            "Event stream closed"
        );
    }
}

/// Frames for a single connection.
///
/// Yields the connect notice, the replay backlog, then live events, with a
/// [`Frame::KeepAlive`] after every idle `keep_alive` interval. Ends when the
/// registry drops the subscription (slow consumer or registry close).
/// Dropping the stream unsubscribes.
pub struct EventStream {
    // Dropped first: unsubscribe before the queue closes
    registration: Registration,
    rx: mpsc::Receiver<Event>,
    keep_alive: Duration,
    idle: Pin<Box<Sleep>>,
}

impl EventStream {
    /// Subscribe to `channel_id` and return the connection's frame stream.
    ///
    /// Must be called from within a Tokio runtime (the keep-alive timer is
    /// registered immediately).
    pub fn open(
        registry: &Arc<ChannelRegistry>,
        channel_id: &str,
        config: &TransportConfig,
    ) -> Result<Self> {
        if registry.is_closed() {
            return Err(Error::RegistryClosed);
        }

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let notice = Event::new(
            channel_id,
            EventKind::Message(ChatMessage::system(format!(
                "Connected to channel {channel_id}"
            ))),
        );
        tx.try_send(notice).map_err(|_| DeliveryError::QueueFull)?;

        // Only the subscription holds a sender from here on, so the stream
        // ends as soon as the registry lets go of it.
        let subscriber_id = registry.subscribe(channel_id, move |event: &Event| {
            tx.try_send(event.clone()).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::QueueFull,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
        });

        info!(channel_id, subscriber_id = %subscriber_id, "Event stream opened");

        let keep_alive = config.keep_alive();
        Ok(Self {
            registration: Registration {
                registry: Arc::downgrade(registry),
                channel_id: channel_id.to_string(),
                subscriber_id,
            },
            rx,
            keep_alive,
            idle: Box::pin(tokio::time::sleep(keep_alive)),
        })
    }

    /// Channel this stream is attached to
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.registration.channel_id
    }

    /// Registry subscriber id backing this stream
    #[must_use]
    pub fn subscriber_id(&self) -> &str {
        &self.registration.subscriber_id
    }

    /// Map every frame to its wire text, for use as an HTTP body.
    pub fn encoded(self) -> impl Stream<Item = Result<String>> + Send + 'static {
        self.map(|frame| frame.encode())
    }

    fn reset_idle(&mut self) {
        let deadline = Instant::now() + self.keep_alive;
        self.idle.as_mut().reset(deadline);
    }
}

impl Stream for EventStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = &mut *self;

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                this.reset_idle();
                return Poll::Ready(Some(Frame::Event(event)));
            }
            Poll::Ready(None) => return Poll::Ready(None),
            Poll::Pending => {}
        }

        match this.idle.as_mut().poll(cx) {
            Poll::Ready(()) => {
                this.reset_idle();
                Poll::Ready(Some(Frame::KeepAlive))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("channel_id", &self.registration.channel_id)
            .field("subscriber_id", &self.registration.subscriber_id)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}
