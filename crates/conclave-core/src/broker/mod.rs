//! Channel registry - in-process publish/subscribe with bounded replay.
//!
//! Producers publish to a named channel; subscribers attached to that channel
//! receive every event synchronously, in publish order, plus a short replay
//! backlog when they join. Channels are created lazily and reaped after a
//! grace period without subscribers.
//!
//! The registry is single-process. Replicas of a deployment each hold their
//! own independent channel state.

/// Per-channel subscriber set and history.
mod channel;
/// Typed convenience publishers.
mod publishers;
/// Registry implementation.
mod registry;

pub use channel::DeliverFn;
pub use registry::{ChannelInfo, ChannelRegistry, SubscriberInfo};
