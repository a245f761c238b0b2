use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::{Applied, Reduce};
use crate::event::{ErrorReport, Event, EventKind, ParticipantStatusUpdate, SubTask};

/// Message lines kept by [`ProgressState`]
pub const LOG_CAPACITY: usize = 200;

/// Content generated for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Accumulated content
    pub content: String,
    /// Last diff reported for the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Last agent that wrote to the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// A `message` event as shown in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Event timestamp (ms)
    pub timestamp: i64,
    /// Author role
    pub role: String,
    /// Text
    pub content: String,
}

/// Delivery pipeline view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    /// Current phase
    pub phase: String,
    /// Percent complete, 0..=100
    pub percent: u8,
    /// Status line
    pub message: String,
    /// Sub-task breakdown of the latest snapshot
    pub sub_tasks: Vec<SubTask>,
    /// Latest status per agent, keyed by participant id
    pub participants: BTreeMap<String, ParticipantStatusUpdate>,
    /// Generated content keyed by file path
    pub files: BTreeMap<String, GeneratedFile>,
    /// Most recent message lines, oldest first
    pub log: VecDeque<LogLine>,
    /// Most recent producer error
    pub last_error: Option<ErrorReport>,
    /// Whether the terminal event arrived
    pub completed: bool,
    /// Closing summary from the terminal event
    pub summary: Option<String>,
    /// Result document from the terminal event
    pub result: Option<serde_json::Value>,
}

impl Reduce for ProgressState {
    fn apply(&mut self, event: &Event) -> Applied {
        match &event.kind {
            EventKind::Progress(update) => {
                self.phase = update.phase.clone();
                self.percent = update.percent.min(100);
                self.message = update.message.clone();
                self.sub_tasks = update.sub_tasks.clone();
                Applied::Changed
            }
            EventKind::ParticipantStatus(status) => {
                self.participants
                    .insert(status.participant_id.clone(), status.clone());
                Applied::Changed
            }
            EventKind::TextDelta(delta) => {
                let file = self.files.entry(delta.file.clone()).or_default();
                file.content.push_str(&delta.content);
                if delta.diff.is_some() {
                    file.diff = delta.diff.clone();
                }
                if delta.agent.is_some() {
                    file.agent = delta.agent.clone();
                }
                Applied::Changed
            }
            EventKind::ContentReplace(replace) => {
                let file = self.files.entry(replace.file.clone()).or_default();
                file.content = replace.content.clone();
                file.diff = None;
                if replace.agent.is_some() {
                    file.agent = replace.agent.clone();
                }
                Applied::Changed
            }
            EventKind::Message(message) => {
                if self.log.len() == LOG_CAPACITY {
                    self.log.pop_front();
                }
                self.log.push_back(LogLine {
                    timestamp: event.timestamp,
                    role: message.role.clone(),
                    content: message.content.clone(),
                });
                Applied::Changed
            }
            EventKind::Complete(completion) => {
                self.completed = true;
                if completion.summary.is_some() {
                    self.summary = completion.summary.clone();
                }
                if completion.result.is_some() {
                    self.result = completion.result.clone();
                }
                Applied::Changed
            }
            EventKind::Error(report) => {
                self.last_error = Some(report.clone());
                Applied::Error(report.clone())
            }
            EventKind::ChannelInit(_)
            | EventKind::RoundStart(_)
            | EventKind::ParticipantSpeaking(_)
            | EventKind::MessageDelta(_)
            | EventKind::MessageComplete(_)
            | EventKind::ConsensusUpdate(_)
            | EventKind::InsightsUpdate(_)
            | EventKind::DecisionClassified(_)
            | EventKind::SummaryComplete(_) => Applied::Ignored,
        }
    }
}
