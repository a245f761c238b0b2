use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::error::DeliveryError;
use crate::event::Event;

/// Delivery callback registered by a subscriber.
///
/// Invoked synchronously from `publish` while the channel is locked, so it
/// must not block and must not call back into the registry for the same
/// channel. Returning an error (or panicking) marks the subscriber dead.
pub type DeliverFn = Box<dyn Fn(&Event) -> Result<(), DeliveryError> + Send + Sync>;

pub(crate) struct Subscriber {
    pub(crate) id: String,
    deliver: DeliverFn,
    pub(crate) joined_at: DateTime<Utc>,
}

impl Subscriber {
    pub(crate) fn new(id: String, deliver: DeliverFn) -> Self {
        Self {
            id,
            deliver,
            joined_at: Utc::now(),
        }
    }

    /// Run the callback, turning a panic into a delivery error.
    pub(crate) fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.deliver)(event))) {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Panicked),
        }
    }
}

/// Outcome of a cleanup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reap {
    /// Channel marked closed; caller removes it from the map
    Removed,
    /// Channel has subscribers again
    Busy,
    /// Still empty but not idle long enough; check again at the deadline
    NotYet(Instant),
}

pub(crate) struct Channel {
    pub(crate) id: String,
    state: Mutex<ChannelState>,
}

pub(crate) struct ChannelState {
    /// Registration order is delivery order
    pub(crate) subscribers: Vec<Subscriber>,
    pub(crate) history: VecDeque<Event>,
    /// Timestamp (ms) of the newest published event
    pub(crate) last_event_at: Option<i64>,
    /// When the subscriber set last became empty (creation for new channels)
    idle_since: Instant,
    pub(crate) reaper_scheduled: bool,
    /// Set once the channel has been removed from the registry
    pub(crate) closed: bool,
}

impl Channel {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            state: Mutex::new(ChannelState {
                subscribers: Vec::new(),
                history: VecDeque::new(),
                last_event_at: None,
                idle_since: now,
                reaper_scheduled: false,
                closed: false,
            }),
        }
    }

    /// Lock the channel state, recovering from a poisoned mutex.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ChannelState {
    /// Append to history, evicting the oldest events beyond `capacity`.
    pub(crate) fn record(&mut self, event: Event, capacity: usize) {
        self.last_event_at = Some(event.timestamp);
        self.history.push_back(event);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }

    /// The most recent `count` events, oldest first.
    pub(crate) fn backlog(&self, count: usize) -> impl Iterator<Item = &Event> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip)
    }

    /// Earliest instant the channel can be reaped if it stays empty.
    pub(crate) fn reap_deadline(&self, grace: Duration) -> Instant {
        self.idle_since + grace
    }

    pub(crate) fn mark_idle(&mut self) {
        self.idle_since = Instant::now();
    }

    /// Decide whether the channel can be dropped.
    ///
    /// A channel is reapable once it has had no subscribers for the whole
    /// grace period. Publishes do not keep an unwatched channel alive.
    pub(crate) fn reap_check(&mut self, grace: Duration, now: Instant) -> Reap {
        if !self.subscribers.is_empty() {
            self.reaper_scheduled = false;
            return Reap::Busy;
        }
        let deadline = self.reap_deadline(grace);
        if now >= deadline {
            self.closed = true;
            self.reaper_scheduled = false;
            Reap::Removed
        } else {
            Reap::NotYet(deadline)
        }
    }
}
