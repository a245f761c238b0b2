//! Reconnecting stream consumer.
//!
//! [`StreamConsumer::start`] spawns a task that connects, decodes and forwards
//! events to a [`ConsumerHandle`]. When the connection fails or ends, the task
//! waits a fixed delay and connects again with a fresh decoder; the server
//! replays recent history on every subscribe, so nothing here tries to resume
//! a half-read frame.

use std::sync::Arc;
use std::time::Duration;

use conclave_core::Event;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::decoder::EventDecoder;
use crate::error::Error;
use crate::source::{ByteSource, ByteStream};

/// Connection lifecycle as seen by the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Opening a connection
    Connecting,
    /// Connected, events are flowing
    Connected,
    /// The connection ended; `error` is `None` for a clean end of stream
    Disconnected {
        /// Failure description
        error: Option<String>,
    },
    /// Waiting before the next attempt
    Reconnecting {
        /// Consecutive attempts since the last successful connect
        attempt: u32,
    },
    /// Cancelled; no more events follow
    Stopped,
}

/// Item delivered to the handle
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    /// A decoded event
    Event(Event),
    /// A connection status change
    Status(ConnectionStatus),
}

/// Spawns consumers over a [`ByteSource`].
pub struct StreamConsumer {
    source: Arc<dyn ByteSource>,
    config: ConsumerConfig,
}

impl StreamConsumer {
    /// Create a consumer factory
    pub fn new(source: Arc<dyn ByteSource>, config: ConsumerConfig) -> Self {
        Self { source, config }
    }

    /// Start consuming `channel_id` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, channel_id: impl Into<String>) -> ConsumerHandle {
        let channel_id = channel_id.into();
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        info!(channel_id = %channel_id, "Starting stream consumer");
        let task = tokio::spawn(run(
            self.source.clone(),
            channel_id,
            self.config.reconnect_delay(),
            tx,
            cancel.clone(),
        ));

        ConsumerHandle {
            rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }
}

impl std::fmt::Debug for StreamConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConsumer")
            .field("config", &self.config)
            .finish()
    }
}

/// Receiving end of a running consumer.
///
/// Dropping the handle cancels the consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    rx: mpsc::Receiver<ConsumerEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Next event or status; `None` once the consumer has stopped.
    pub async fn next(&mut self) -> Option<ConsumerEvent> {
        self.rx.recv().await
    }

    /// Stop the consumer: aborts an in-flight connect or read and prevents a
    /// scheduled reconnect. Safe to call any number of times, also after the
    /// consumer already stopped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the background task to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Stream consumer task failed");
        }
    }
}

/// How one connection ended
enum Outcome {
    /// Server closed the stream
    Ended,
    /// Read error
    Failed(Error),
    /// Cancelled, or the handle is gone
    Stopped,
}

async fn run(
    source: Arc<dyn ByteSource>,
    channel_id: String,
    delay: Duration,
    tx: mpsc::Sender<ConsumerEvent>,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        if !emit(&tx, &cancel, ConsumerEvent::Status(ConnectionStatus::Connecting)).await {
            break;
        }

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.connect(&channel_id) => result,
        };

        let error = match connected {
            Ok(stream) => {
                attempt = 0;
                debug!(channel_id = %channel_id, "Stream connected");
                if !emit(&tx, &cancel, ConsumerEvent::Status(ConnectionStatus::Connected)).await {
                    break;
                }
                match pump(stream, &tx, &cancel).await {
                    Outcome::Stopped => break,
                    Outcome::Ended => {
                        info!(channel_id = %channel_id, "Stream ended by server");
                        None
                    }
                    Outcome::Failed(e) => {
                        warn!(channel_id = %channel_id, error = %e, "Stream read failed");
                        Some(e.to_string())
                    }
                }
            }
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Stream connect failed");
                Some(e.to_string())
            }
        };

        if !emit(
            &tx,
            &cancel,
            ConsumerEvent::Status(ConnectionStatus::Disconnected { error }),
        )
        .await
        {
            break;
        }

        attempt = attempt.saturating_add(1);
        if !emit(
            &tx,
            &cancel,
            ConsumerEvent::Status(ConnectionStatus::Reconnecting { attempt }),
        )
        .await
        {
            break;
        }
        debug!(channel_id = %channel_id, attempt, delay_secs = delay.as_secs(), "Reconnecting after delay");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    // Best effort: the handle may already be gone or not reading
    let _ = tx.try_send(ConsumerEvent::Status(ConnectionStatus::Stopped));
    info!(channel_id = %channel_id, "Stream consumer stopped");
}

/// Read one connection to its end with a fresh decoder.
async fn pump(
    mut stream: ByteStream,
    tx: &mpsc::Sender<ConsumerEvent>,
    cancel: &CancellationToken,
) -> Outcome {
    let mut decoder = EventDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Stopped,
            chunk = stream.next() => chunk,
        };

        let events = match chunk {
            Some(Ok(bytes)) => decoder.feed(&bytes),
            // Partial frame in the decoder is discarded with it
            Some(Err(e)) => return Outcome::Failed(e),
            None => {
                for event in decoder.finish() {
                    if !emit(tx, cancel, ConsumerEvent::Event(event)).await {
                        return Outcome::Stopped;
                    }
                }
                return Outcome::Ended;
            }
        };

        for event in events {
            if !emit(tx, cancel, ConsumerEvent::Event(event)).await {
                return Outcome::Stopped;
            }
        }
    }
}

/// Send to the handle; `false` when cancelled or the handle is gone.
async fn emit(
    tx: &mpsc::Sender<ConsumerEvent>,
    cancel: &CancellationToken,
    event: ConsumerEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockByteSource;
    use bytes::Bytes;
    use conclave_core::{encode_frame, ChatMessage, EventKind};
    use futures::stream;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn message(text: &str) -> Event {
        Event::new("proj", EventKind::Message(ChatMessage::system(text)))
    }

    /// Body that yields `chunks` and then ends
    fn body(chunks: Vec<Vec<u8>>) -> ByteStream {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))).boxed()
    }

    /// Body that never yields
    fn silent() -> ByteStream {
        stream::pending().boxed()
    }

    fn consumer(source: MockByteSource) -> StreamConsumer {
        StreamConsumer::new(Arc::new(source), ConsumerConfig::default())
    }

    fn status(status: ConnectionStatus) -> Option<ConsumerEvent> {
        Some(ConsumerEvent::Status(status))
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_events_and_reconnects_after_end() {
        let first = message("first");
        let second = message("second");
        let wire = format!(
            "{}{}",
            encode_frame(&first).unwrap(),
            encode_frame(&second).unwrap()
        )
        .into_bytes();
        // Split inside the first frame
        let chunks = vec![wire[..17].to_vec(), wire[17..].to_vec()];

        let mut seq = Sequence::new();
        let mut source = MockByteSource::new();
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |channel_id| {
                assert_eq!(channel_id, "proj");
                Ok(body(chunks.clone()))
            });
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(silent()));

        let mut handle = consumer(source).start("proj");

        assert_eq!(handle.next().await, status(ConnectionStatus::Connecting));
        assert_eq!(handle.next().await, status(ConnectionStatus::Connected));
        assert_eq!(handle.next().await, Some(ConsumerEvent::Event(first)));
        assert_eq!(handle.next().await, Some(ConsumerEvent::Event(second)));
        assert_eq!(
            handle.next().await,
            status(ConnectionStatus::Disconnected { error: None })
        );
        assert_eq!(
            handle.next().await,
            status(ConnectionStatus::Reconnecting { attempt: 1 })
        );

        let waiting = Instant::now();
        assert_eq!(handle.next().await, status(ConnectionStatus::Connecting));
        assert!(waiting.elapsed() >= Duration::from_secs(3));
        assert!(waiting.elapsed() < Duration::from_secs(4));
        assert_eq!(handle.next().await, status(ConnectionStatus::Connected));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failures_count_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockByteSource::new();
        source.expect_connect().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("connection refused".to_string()))
        });

        let mut handle = consumer(source).start("proj");

        for attempt in 1..=3 {
            assert_eq!(handle.next().await, status(ConnectionStatus::Connecting));
            match handle.next().await {
                Some(ConsumerEvent::Status(ConnectionStatus::Disconnected { error: Some(e) })) => {
                    assert!(e.contains("connection refused"));
                }
                other => panic!("expected disconnect, got: {:?}", other),
            }
            assert_eq!(
                handle.next().await,
                status(ConnectionStatus::Reconnecting { attempt })
            );
        }

        handle.stop().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_discards_partial_frame() {
        let event = message("after reconnect");
        let frame = encode_frame(&event).unwrap().into_bytes();
        let partial = frame[..frame.len() / 2].to_vec();

        let mut seq = Sequence::new();
        let mut source = MockByteSource::new();
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                let chunks = vec![
                    Ok(Bytes::from(partial.clone())),
                    Err(Error::Transport("connection reset".to_string())),
                ];
                Ok(stream::iter(chunks).boxed())
            });
        source
            .expect_connect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(body(vec![frame.clone()]).chain(silent()).boxed()));

        let mut handle = consumer(source).start("proj");

        let mut received = Vec::new();
        loop {
            match handle.next().await {
                Some(ConsumerEvent::Event(e)) => {
                    received.push(e);
                    break;
                }
                Some(ConsumerEvent::Status(_)) => {}
                None => panic!("consumer stopped early"),
            }
        }

        assert_eq!(received, vec![event]);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_read() {
        let mut source = MockByteSource::new();
        source.expect_connect().times(1).returning(|_| Ok(silent()));

        let mut handle = consumer(source).start("proj");
        assert_eq!(handle.next().await, status(ConnectionStatus::Connecting));
        assert_eq!(handle.next().await, status(ConnectionStatus::Connected));

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        assert_eq!(handle.next().await, status(ConnectionStatus::Stopped));
        assert_eq!(handle.next().await, None);
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_scheduled_reconnect() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockByteSource::new();
        source.expect_connect().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(body(Vec::new()))
        });

        let mut handle = consumer(source).start("proj");
        loop {
            if let Some(ConsumerEvent::Status(ConnectionStatus::Reconnecting { .. })) =
                handle.next().await
            {
                break;
            }
        }

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(handle.next().await, status(ConnectionStatus::Stopped));
        assert_eq!(handle.next().await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockByteSource::new();
        source.expect_connect().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("down".to_string()))
        });

        let handle = consumer(source).start("proj");
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
