use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use super::{Applied, Reduce};
use crate::event::{
    ChannelInit, DecisionClassification, ErrorReport, Event, EventKind, MessageComplete,
    MessageDelta, Participant, Summary,
};

/// One participant's message within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionMessage {
    /// Round the message belongs to
    pub round: u32,
    /// Speaker
    pub participant_id: String,
    /// Text so far; final once `is_streaming` is false
    pub content: String,
    /// Whether deltas are still arriving
    pub is_streaming: bool,
}

/// Deliberation view state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionState {
    /// Current round
    pub round: u32,
    /// Round limit
    pub max_rounds: u32,
    /// Roster
    pub participants: Vec<Participant>,
    /// Messages in speaking order, unique per `(round, participant_id)`
    pub messages: Vec<DiscussionMessage>,
    /// Who is speaking right now
    pub speaking_participant_id: Option<String>,
    /// Consensus, 0..=100
    pub consensus_level: u8,
    /// Key insights (set semantics)
    pub key_insights: BTreeSet<String>,
    /// Classified decisions, append-only
    pub decisions: Vec<DecisionClassification>,
    /// Final summary, once produced
    pub summary: Option<Summary>,
    /// Most recent producer error
    pub last_error: Option<ErrorReport>,
}

impl DiscussionState {
    /// Message at `(round, participant_id)`
    #[must_use]
    pub fn message(&self, round: u32, participant_id: &str) -> Option<&DiscussionMessage> {
        self.messages
            .iter()
            .find(|m| m.round == round && m.participant_id == participant_id)
    }

    /// Whether a summary has been produced
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.summary.is_some()
    }

    fn position(&self, participant_id: &str) -> Option<usize> {
        let round = self.round;
        self.messages
            .iter()
            .position(|m| m.round == round && m.participant_id == participant_id)
    }

    fn init(&mut self, init: &ChannelInit) -> Applied {
        self.round = init.round;
        self.max_rounds = init.max_rounds;
        self.participants = init.participants.clone();
        Applied::Changed
    }

    fn start_speaking(&mut self, participant_id: &str) -> Applied {
        if let Some(stale) = self.position(participant_id) {
            self.messages.remove(stale);
        }
        self.messages.push(DiscussionMessage {
            round: self.round,
            participant_id: participant_id.to_string(),
            content: String::new(),
            is_streaming: true,
        });
        self.speaking_participant_id = Some(participant_id.to_string());
        Applied::Changed
    }

    fn append_delta(&mut self, event: &Event, delta: &MessageDelta) -> Applied {
        if let Some(index) = self.position(&delta.participant_id) {
            let message = &mut self.messages[index];
            if !message.is_streaming {
                warn!(
                    event_id = %event.id,
                    round = self.round,
                    participant_id = %delta.participant_id,
                    "Delta after completion ignored"
                );
                return Applied::Ignored;
            }
            message.content.push_str(&delta.text);
            return Applied::Changed;
        }

        warn!(
            event_id = %event.id,
            round = self.round,
            participant_id = %delta.participant_id,
            "Delta without a started message, synthesizing placeholder"
        );
        self.messages.push(DiscussionMessage {
            round: self.round,
            participant_id: delta.participant_id.clone(),
            content: delta.text.clone(),
            is_streaming: true,
        });
        Applied::Repaired
    }

    fn complete_message(&mut self, event: &Event, complete: &MessageComplete) -> Applied {
        if self.speaking_participant_id.as_deref() == Some(complete.participant_id.as_str()) {
            self.speaking_participant_id = None;
        }

        if let Some(index) = self.position(&complete.participant_id) {
            let message = &mut self.messages[index];
            message.content = complete.content.clone();
            message.is_streaming = false;
            return Applied::Changed;
        }

        warn!(
            event_id = %event.id,
            round = self.round,
            participant_id = %complete.participant_id,
            "Completion without a started message, synthesizing placeholder"
        );
        self.messages.push(DiscussionMessage {
            round: self.round,
            participant_id: complete.participant_id.clone(),
            content: complete.content.clone(),
            is_streaming: false,
        });
        Applied::Repaired
    }
}

impl Reduce for DiscussionState {
    fn apply(&mut self, event: &Event) -> Applied {
        match &event.kind {
            EventKind::ChannelInit(init) => self.init(init),
            EventKind::RoundStart(start) => {
                self.round = start.round;
                Applied::Changed
            }
            EventKind::ParticipantSpeaking(speaking) => {
                self.start_speaking(&speaking.participant_id)
            }
            EventKind::MessageDelta(delta) => self.append_delta(event, delta),
            EventKind::MessageComplete(complete) => self.complete_message(event, complete),
            EventKind::ConsensusUpdate(update) => {
                self.consensus_level = update.level.min(100);
                Applied::Changed
            }
            EventKind::InsightsUpdate(update) => {
                let before = self.key_insights.len();
                self.key_insights.extend(update.insights.iter().cloned());
                if self.key_insights.len() == before {
                    Applied::Ignored
                } else {
                    Applied::Changed
                }
            }
            EventKind::DecisionClassified(decision) => {
                self.decisions.push(decision.clone());
                Applied::Changed
            }
            EventKind::SummaryComplete(summary) => {
                self.summary = Some(summary.clone());
                self.speaking_participant_id = None;
                Applied::Changed
            }
            EventKind::Complete(completion) => {
                let text = completion
                    .summary
                    .clone()
                    .or_else(|| completion.result.as_ref().and_then(summary_from_result));
                match text {
                    Some(text) => self.summary = Some(Summary::text(text)),
                    // Keep a summary already delivered by summary_complete
                    None if self.summary.is_some() => return Applied::Ignored,
                    None => self.summary = Some(Summary::text(String::new())),
                }
                self.speaking_participant_id = None;
                Applied::Changed
            }
            EventKind::Error(report) => {
                self.last_error = Some(report.clone());
                Applied::Error(report.clone())
            }
            EventKind::Progress(_)
            | EventKind::ParticipantStatus(_)
            | EventKind::TextDelta(_)
            | EventKind::ContentReplace(_)
            | EventKind::Message(_) => Applied::Ignored,
        }
    }
}

/// Closing text carried in a completion result: a bare string or a
/// `summary` field.
fn summary_from_result(result: &serde_json::Value) -> Option<String> {
    result
        .as_str()
        .or_else(|| result.get("summary").and_then(serde_json::Value::as_str))
        .map(str::to_string)
}
