//! Typed publish helpers for producers.
//!
//! Each helper builds a correctly shaped [`Event`] and hands it to
//! [`ChannelRegistry::publish`]; none adds semantics of its own.

use super::registry::ChannelRegistry;
use crate::event::{
    AgentStatus, ChannelInit, ChatMessage, Completion, ConsensusUpdate, ContentReplace,
    DecisionClassification, ErrorReport, Event, EventKind, InsightsUpdate, MessageComplete,
    MessageDelta, Participant, ParticipantSpeaking, ParticipantStatusUpdate, ProgressUpdate,
    RoundStart, SubTask, Summary, TextDelta,
};

impl ChannelRegistry {
    /// Publish a delivery progress snapshot. `percent` is clamped to 100.
    pub fn publish_progress(
        &self,
        channel_id: &str,
        phase: impl Into<String>,
        percent: u8,
        message: impl Into<String>,
        sub_tasks: Vec<SubTask>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::Progress(ProgressUpdate {
                phase: phase.into(),
                percent: percent.min(100),
                message: message.into(),
                sub_tasks,
            }),
        )
    }

    /// Publish an agent/participant status change.
    pub fn publish_participant_status(
        &self,
        channel_id: &str,
        participant_id: impl Into<String>,
        name: impl Into<String>,
        status: AgentStatus,
        task: Option<String>,
        progress: Option<u8>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::ParticipantStatus(ParticipantStatusUpdate {
                participant_id: participant_id.into(),
                name: name.into(),
                status,
                task,
                progress: progress.map(|p| p.min(100)),
            }),
        )
    }

    /// Publish generated content to append to a file.
    pub fn publish_text_delta(
        &self,
        channel_id: &str,
        file: impl Into<String>,
        content: impl Into<String>,
        diff: Option<String>,
        agent: Option<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::TextDelta(TextDelta {
                file: file.into(),
                content: content.into(),
                diff,
                agent,
            }),
        )
    }

    /// Publish the full content of a file, replacing earlier deltas.
    pub fn publish_content_replace(
        &self,
        channel_id: &str,
        file: impl Into<String>,
        content: impl Into<String>,
        agent: Option<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::ContentReplace(ContentReplace {
                file: file.into(),
                content: content.into(),
                agent,
            }),
        )
    }

    /// Publish a producer error.
    pub fn publish_error(
        &self,
        channel_id: &str,
        code: impl Into<String>,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::Error(ErrorReport {
                code: code.into(),
                message: message.into(),
                recoverable,
            }),
        )
    }

    /// Publish a free-form message.
    pub fn publish_message(
        &self,
        channel_id: &str,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::Message(ChatMessage {
                role: role.into(),
                content: content.into(),
            }),
        )
    }

    /// Publish the terminal event for the channel's work.
    pub fn publish_complete(
        &self,
        channel_id: &str,
        summary: Option<String>,
        result: Option<serde_json::Value>,
    ) -> Event {
        self.publish_kind(channel_id, EventKind::Complete(Completion { summary, result }))
    }

    /// Publish the deliberation roster.
    pub fn publish_channel_init(
        &self,
        channel_id: &str,
        round: u32,
        max_rounds: u32,
        participants: Vec<Participant>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::ChannelInit(ChannelInit {
                round,
                max_rounds,
                participants,
            }),
        )
    }

    /// Publish the start of a deliberation round.
    pub fn publish_round_start(&self, channel_id: &str, round: u32) -> Event {
        self.publish_kind(channel_id, EventKind::RoundStart(RoundStart { round }))
    }

    /// Publish a speaker change.
    pub fn publish_participant_speaking(
        &self,
        channel_id: &str,
        participant_id: impl Into<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::ParticipantSpeaking(ParticipantSpeaking {
                participant_id: participant_id.into(),
            }),
        )
    }

    /// Publish a streaming text fragment for the current speaker.
    pub fn publish_message_delta(
        &self,
        channel_id: &str,
        participant_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::MessageDelta(MessageDelta {
                participant_id: participant_id.into(),
                text: text.into(),
            }),
        )
    }

    /// Publish the final text of a speaker's message.
    pub fn publish_message_complete(
        &self,
        channel_id: &str,
        participant_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::MessageComplete(MessageComplete {
                participant_id: participant_id.into(),
                content: content.into(),
            }),
        )
    }

    /// Publish the consensus level. Clamped to 100.
    pub fn publish_consensus(&self, channel_id: &str, level: u8) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::ConsensusUpdate(ConsensusUpdate {
                level: level.min(100),
            }),
        )
    }

    /// Publish newly surfaced key insights.
    pub fn publish_insights(&self, channel_id: &str, insights: Vec<String>) -> Event {
        self.publish_kind(
            channel_id,
            EventKind::InsightsUpdate(InsightsUpdate { insights }),
        )
    }

    /// Publish a classified decision.
    pub fn publish_decision(&self, channel_id: &str, decision: DecisionClassification) -> Event {
        self.publish_kind(channel_id, EventKind::DecisionClassified(decision))
    }

    /// Publish the deliberation summary.
    pub fn publish_summary(&self, channel_id: &str, summary: Summary) -> Event {
        self.publish_kind(channel_id, EventKind::SummaryComplete(summary))
    }
}
