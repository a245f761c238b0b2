use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channel::{Channel, ChannelState, DeliverFn, Reap, Subscriber};
use crate::config::BrokerConfig;
use crate::error::DeliveryError;
use crate::event::{Event, EventKind};

/// Introspection row returned by [`ChannelRegistry::active_channels`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    /// Channel identifier
    pub channel_id: String,
    /// Live subscribers
    pub subscriber_count: usize,
    /// Timestamp (ms) of the newest event, if any was published
    pub last_event_at: Option<i64>,
}

/// Introspection row returned by [`ChannelRegistry::subscribers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberInfo {
    /// Subscriber identifier
    pub subscriber_id: String,
    /// When the subscriber joined
    pub joined_at: DateTime<Utc>,
}

/// Registry of named channels.
///
/// Construct one per process with [`ChannelRegistry::new`] and share the
/// returned `Arc`. Channels live in a sharded concurrent map; each channel
/// serializes its own publish/subscribe/unsubscribe, so activity on one
/// channel never blocks another.
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<Channel>>,
    config: BrokerConfig,
    /// Cancels pending cleanup tasks on close
    shutdown: CancellationToken,
    /// Runtime that runs cleanup timers, whichever thread empties a channel
    runtime: Option<Handle>,
    /// Subscribers removed after a failed delivery
    dropped: AtomicU64,
    closed: AtomicBool,
    this: Weak<ChannelRegistry>,
}

impl ChannelRegistry {
    /// Create a new registry.
    ///
    /// Cleanup timers run on the Tokio runtime current at construction. Off
    /// a runtime, use [`with_runtime`](Self::with_runtime) instead; otherwise
    /// empty channels are only reaped once a later call happens on one.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Arc<Self> {
        Self::build(config, Handle::try_current().ok())
    }

    /// Create a registry whose cleanup timers run on `runtime`.
    #[must_use]
    pub fn with_runtime(config: BrokerConfig, runtime: Handle) -> Arc<Self> {
        Self::build(config, Some(runtime))
    }

    fn build(config: BrokerConfig, runtime: Option<Handle>) -> Arc<Self> {
        if runtime.is_none() {
            debug!("Channel registry created outside a runtime");
        }
        Arc::new_cyclic(|this| Self {
            channels: DashMap::new(),
            config,
            shutdown: CancellationToken::new(),
            runtime,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    /// Registry configuration
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Attach a subscriber to a channel, creating the channel if needed.
    ///
    /// Before returning, the most recent `replay_count` events of the
    /// channel's history are delivered to `deliver` in order, so a late
    /// joiner sees recent context. Live events published afterwards follow
    /// the backlog without gaps or reordering.
    pub fn subscribe<F>(&self, channel_id: &str, deliver: F) -> String
    where
        F: Fn(&Event) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let subscriber_id = Uuid::new_v4().to_string();
        let subscriber = Subscriber::new(subscriber_id.clone(), Box::new(deliver) as DeliverFn);

        loop {
            let Some(channel) = self.channel(channel_id) else {
                debug!(channel_id, "Subscribe ignored, registry closed");
                return subscriber_id;
            };
            let mut state = channel.lock();
            if state.closed {
                // Reaped between lookup and lock; retry against a fresh channel
                continue;
            }

            let mut replayed = 0usize;
            let mut failure = None;
            for event in state.backlog(self.config.replay_count) {
                if let Err(e) = subscriber.deliver(event) {
                    failure = Some(e);
                    break;
                }
                replayed += 1;
            }

            match failure {
                None => {
                    state.subscribers.push(subscriber);
                    debug!(
                        channel_id,
                        subscriber_id = %subscriber_id,
                        replayed,
                        subscribers = state.subscribers.len(),
                        "Subscriber joined"
                    );
                }
                Some(error) => {
                    warn!(
                        channel_id,
                        subscriber_id = %subscriber_id,
                        error = %error,
                        "Subscriber failed during replay, not registered"
                    );
                    if state.subscribers.is_empty() {
                        self.schedule_cleanup(&channel, &mut state);
                    }
                }
            }
            return subscriber_id;
        }
    }

    /// Detach a subscriber. Idempotent; returns whether it was attached.
    ///
    /// When the last subscriber leaves, a deferred cleanup is scheduled. The
    /// cleanup re-checks the channel when it fires and leaves it alone if a
    /// subscriber joined in the meantime.
    pub fn unsubscribe(&self, channel_id: &str, subscriber_id: &str) -> bool {
        let Some(channel) = self.channels.get(channel_id).map(|c| c.value().clone()) else {
            return false;
        };
        let mut state = channel.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != subscriber_id);
        let removed = state.subscribers.len() != before;

        if removed {
            debug!(
                channel_id,
                subscriber_id,
                remaining = state.subscribers.len(),
                "Subscriber left"
            );
            if state.subscribers.is_empty() {
                state.mark_idle();
                self.schedule_cleanup(&channel, &mut state);
            }
        }
        removed
    }

    /// Publish an event to its channel.
    ///
    /// The event is appended to the channel history and delivered
    /// synchronously to every subscriber in registration order. A failing or
    /// panicking subscriber is logged and removed; the remaining subscribers
    /// still receive the event. Returns the number of successful deliveries.
    pub fn publish(&self, event: Event) -> usize {
        loop {
            let Some(channel) = self.channel(&event.channel_id) else {
                debug!(channel_id = %event.channel_id, kind = event.kind_name(), "Publish dropped, registry closed");
                return 0;
            };
            let mut state = channel.lock();
            if state.closed {
                continue;
            }

            state.record(event.clone(), self.config.history_capacity);

            let mut delivered = 0usize;
            let mut dead = Vec::new();
            for subscriber in &state.subscribers {
                match subscriber.deliver(&event) {
                    Ok(()) => delivered += 1,
                    Err(error) => {
                        warn!(
                            channel_id = %event.channel_id,
                            subscriber_id = %subscriber.id,
                            kind = event.kind_name(),
                            error = %error,
                            "Delivery failed, dropping subscriber"
                        );
                        dead.push(subscriber.id.clone());
                    }
                }
            }

            if !dead.is_empty() {
                self.dropped.fetch_add(dead.len() as u64, Ordering::Relaxed);
                state.subscribers.retain(|s| !dead.contains(&s.id));
                if state.subscribers.is_empty() {
                    state.mark_idle();
                }
            }
            if state.subscribers.is_empty() {
                self.schedule_cleanup(&channel, &mut state);
            }
            return delivered;
        }
    }

    /// Build an event of the given kind, publish it and return it.
    pub fn publish_kind(&self, channel_id: &str, kind: EventKind) -> Event {
        let event = Event::new(channel_id, kind);
        self.publish(event.clone());
        event
    }

    /// Channels sorted most recently active first.
    #[must_use]
    pub fn active_channels(&self) -> Vec<ChannelInfo> {
        let channels: Vec<Arc<Channel>> =
            self.channels.iter().map(|e| e.value().clone()).collect();

        let mut infos: Vec<ChannelInfo> = channels
            .iter()
            .map(|channel| {
                let state = channel.lock();
                ChannelInfo {
                    channel_id: channel.id.clone(),
                    subscriber_count: state.subscribers.len(),
                    last_event_at: state.last_event_at,
                }
            })
            .collect();

        // None sorts below Some, so quiet channels end up last
        infos.sort_by(|a, b| {
            b.last_event_at
                .cmp(&a.last_event_at)
                .then_with(|| a.channel_id.cmp(&b.channel_id))
        });
        infos
    }

    /// Snapshot of a channel's history, oldest first.
    #[must_use]
    pub fn history(&self, channel_id: &str) -> Vec<Event> {
        self.channels
            .get(channel_id)
            .map(|c| c.value().clone())
            .map(|channel| channel.lock().history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Subscribers attached to a channel, in delivery order.
    #[must_use]
    pub fn subscribers(&self, channel_id: &str) -> Vec<SubscriberInfo> {
        self.channels
            .get(channel_id)
            .map(|c| c.value().clone())
            .map(|channel| {
                channel
                    .lock()
                    .subscribers
                    .iter()
                    .map(|s| SubscriberInfo {
                        subscriber_id: s.id.clone(),
                        joined_at: s.joined_at,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of subscribers on a channel (0 if it does not exist).
    #[must_use]
    pub fn subscriber_count(&self, channel_id: &str) -> usize {
        self.channels
            .get(channel_id)
            .map(|c| c.value().clone())
            .map(|channel| channel.lock().subscribers.len())
            .unwrap_or(0)
    }

    /// Whether a channel currently exists
    #[must_use]
    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    /// Number of live channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total subscribers removed because a delivery failed or panicked.
    /// Ordinary unsubscribes are not counted.
    #[must_use]
    pub fn dropped_subscribers(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shut the registry down.
    ///
    /// Cancels pending cleanups and drops every channel together with its
    /// subscribers (their delivery callbacks are dropped, which ends any
    /// attached transport stream). Later publishes and subscribes are no-ops.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Channel registry already closed");
            return;
        }
        self.shutdown.cancel();

        let channels: Vec<Arc<Channel>> =
            self.channels.iter().map(|e| e.value().clone()).collect();
        let mut detached = 0usize;
        for channel in &channels {
            let mut state = channel.lock();
            state.closed = true;
            detached += state.subscribers.len();
            state.subscribers.clear();
        }
        self.channels.clear();

        info!(
            channels = channels.len(),
            subscribers = detached,
            "Channel registry closed"
        );
    }

    /// Look up or lazily create a channel. `None` once closed.
    fn channel(&self, channel_id: &str) -> Option<Arc<Channel>> {
        if self.is_closed() {
            return None;
        }
        let channel = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                debug!(channel_id, "Channel created");
                Arc::new(Channel::new(channel_id))
            })
            .value()
            .clone();
        Some(channel)
    }

    /// Spawn the deferred cleanup for an empty channel, once.
    fn schedule_cleanup(&self, channel: &Arc<Channel>, state: &mut ChannelState) {
        if state.reaper_scheduled || state.closed || self.is_closed() {
            return;
        }
        let Some(handle) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(channel_id = %channel.id, "No async runtime, channel cleanup deferred");
            return;
        };
        state.reaper_scheduled = true;

        let registry = self.this.clone();
        let channel = channel.clone();
        let grace = self.config.cleanup_grace();
        let deadline = state.reap_deadline(grace);
        let shutdown = self.shutdown.clone();
        handle.spawn(reap_when_idle(registry, channel, grace, deadline, shutdown));
    }

    /// Remove the channel if it is still the registered instance and has been
    /// idle for the grace period.
    fn try_reap(&self, channel: &Arc<Channel>, grace: Duration) -> Reap {
        let mut outcome = Reap::Busy;
        let removed = self.channels.remove_if(&channel.id, |_, current| {
            if !Arc::ptr_eq(current, channel) {
                return false;
            }
            outcome = current.lock().reap_check(grace, tokio::time::Instant::now());
            outcome == Reap::Removed
        });
        if removed.is_some() {
            info!(channel_id = %channel.id, "Idle channel removed");
        }
        outcome
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels.len())
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn reap_when_idle(
    registry: Weak<ChannelRegistry>,
    channel: Arc<Channel>,
    grace: Duration,
    mut deadline: tokio::time::Instant,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep_until(deadline) => {}
        }
        let Some(registry) = registry.upgrade() else {
            return;
        };
        match registry.try_reap(&channel, grace) {
            Reap::Removed | Reap::Busy => return,
            Reap::NotYet(next) => {
                debug!(channel_id = %channel.id, "Channel active within grace period, cleanup deferred");
                deadline = next;
            }
        }
    }
}
