//! State reconstruction - pure folds from an event sequence to view state.
//!
//! The event stream is the single source of truth: a viewer that reconnects
//! rebuilds its state by folding the replayed events, and two viewers that
//! fold the same sequence end up with identical state.

mod discussion;
mod progress;

pub use discussion::{DiscussionMessage, DiscussionState};
pub use progress::{GeneratedFile, LogLine, ProgressState, LOG_CAPACITY};

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::event::{ErrorReport, Event};

/// Outcome of folding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The state changed
    Changed,
    /// The event does not concern this state
    Ignored,
    /// The event referenced a message that was never started; a placeholder
    /// was synthesized
    Repaired,
    /// A producer error; surfaced to the caller, state otherwise untouched
    Error(ErrorReport),
}

/// A state that can be rebuilt by folding events in order.
pub trait Reduce: Default {
    /// Fold one event into the state.
    fn apply(&mut self, event: &Event) -> Applied;

    /// Consuming form of [`apply`](Self::apply).
    #[must_use]
    fn reduce(mut self, event: &Event) -> Self
    where
        Self: Sized,
    {
        self.apply(event);
        self
    }

    /// Fold a whole sequence starting from the default state.
    #[must_use]
    fn fold<'a, I>(events: I) -> Self
    where
        Self: Sized,
        I: IntoIterator<Item = &'a Event>,
    {
        events.into_iter().fold(Self::default(), Self::reduce)
    }
}

/// Event ids remembered for duplicate suppression
const DEDUP_WINDOW: usize = 256;

type ErrorCallback = Box<dyn FnMut(&ErrorReport) + Send>;

/// Live reconstructor for a consumer.
///
/// Wraps a [`Reduce`] state, forwards producer errors to a callback and
/// skips events it has already applied. A reconnect replays the channel's
/// recent history, so without the id check the tail of the previous
/// connection would be folded twice.
pub struct Reconstructor<S> {
    state: S,
    on_error: Option<ErrorCallback>,
    recent: VecDeque<String>,
    seen: HashSet<String>,
}

impl<S: Reduce> Reconstructor<S> {
    /// Start from the default state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(S::default())
    }

    /// Start from an existing state.
    #[must_use]
    pub fn with_state(state: S) -> Self {
        Self {
            state,
            on_error: None,
            recent: VecDeque::with_capacity(DEDUP_WINDOW),
            seen: HashSet::with_capacity(DEDUP_WINDOW),
        }
    }

    /// Register the producer-error callback.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ErrorReport) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Fold one event unless it was already applied.
    pub fn apply(&mut self, event: &Event) -> Applied {
        if self.seen.contains(&event.id) {
            debug!(event_id = %event.id, kind = event.kind_name(), "Duplicate event skipped");
            return Applied::Ignored;
        }
        self.remember(&event.id);

        let applied = self.state.apply(event);
        if let Applied::Error(report) = &applied {
            if let Some(callback) = self.on_error.as_mut() {
                callback(report);
            }
        }
        applied
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consume the reconstructor and return the state
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }

    /// Drop the state and the remembered ids; the callback stays.
    pub fn reset(&mut self) {
        self.state = S::default();
        self.recent.clear();
        self.seen.clear();
    }

    fn remember(&mut self, id: &str) {
        if self.recent.len() == DEDUP_WINDOW {
            if let Some(oldest) = self.recent.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.recent.push_back(id.to_string());
        self.seen.insert(id.to_string());
    }
}

impl<S: Reduce> Default for Reconstructor<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Reconstructor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconstructor")
            .field("state", &self.state)
            .field("remembered", &self.recent.len())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
