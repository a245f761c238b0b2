//! Event model - the typed envelope carried from producers to observers.
//!
//! Every event serializes to a single JSON object:
//!
//! ```text
//! {"id":"0190…","channelId":"proj-1","timestamp":1718000000000,"type":"message_delta","data":{"participantId":"ceo","text":"Hel"}}
//! ```
//!
//! The `type` tag selects the payload shape under `data`; the set of kinds is
//! closed ([`EventKind`]), so every consumer matches it exhaustively.

/// Payload types for each event kind.
pub mod types;

pub use types::*;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single progress event published to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique, time-ordered identifier (UUIDv7). Used for dedup and
    /// debugging, never for ordering.
    pub id: String,
    /// Channel (project/session) this event belongs to
    #[serde(alias = "projectId")]
    pub channel_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Kind tag plus kind-specific payload
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Create a new event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(channel_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            channel_id: channel_id.into(),
            timestamp: Utc::now().timestamp_millis(),
            kind,
        }
    }

    /// Wire name of this event's kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Closed set of event kinds with their payloads.
///
/// Serialized adjacently tagged: `{"type": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    /// Delivery pipeline progress snapshot (replaces the previous one)
    Progress(ProgressUpdate),
    /// An agent/participant changed status
    ParticipantStatus(ParticipantStatusUpdate),
    /// Incremental generated content for a file
    TextDelta(TextDelta),
    /// Full replacement content for a file
    ContentReplace(ContentReplace),
    /// Upstream producer error
    Error(ErrorReport),
    /// Free-form message (also used for system notices)
    Message(ChatMessage),
    /// Deliberation roster and round limits
    ChannelInit(ChannelInit),
    /// A new deliberation round began
    RoundStart(RoundStart),
    /// A participant started speaking
    ParticipantSpeaking(ParticipantSpeaking),
    /// Streaming text for the current speaker
    MessageDelta(MessageDelta),
    /// Authoritative final text of a speaker's message
    MessageComplete(MessageComplete),
    /// Consensus level changed
    ConsensusUpdate(ConsensusUpdate),
    /// New key insights
    InsightsUpdate(InsightsUpdate),
    /// A decision was classified
    DecisionClassified(DecisionClassification),
    /// Final deliberation summary
    SummaryComplete(Summary),
    /// Terminal event for the channel's work
    Complete(Completion),
}

impl EventKind {
    /// Wire name of this kind (the `type` tag).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::ParticipantStatus(_) => "participant_status",
            Self::TextDelta(_) => "text_delta",
            Self::ContentReplace(_) => "content_replace",
            Self::Error(_) => "error",
            Self::Message(_) => "message",
            Self::ChannelInit(_) => "channel_init",
            Self::RoundStart(_) => "round_start",
            Self::ParticipantSpeaking(_) => "participant_speaking",
            Self::MessageDelta(_) => "message_delta",
            Self::MessageComplete(_) => "message_complete",
            Self::ConsensusUpdate(_) => "consensus_update",
            Self::InsightsUpdate(_) => "insights_update",
            Self::DecisionClassified(_) => "decision_classified",
            Self::SummaryComplete(_) => "summary_complete",
            Self::Complete(_) => "complete",
        }
    }

    /// Whether this kind marks the end of the channel's work.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SummaryComplete(_) | Self::Complete(_))
    }
}

#[cfg(test)]
mod tests;
