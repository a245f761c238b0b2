use serde::{Deserialize, Serialize};

/// Status of one sub-task inside a progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    /// Not started
    #[default]
    Pending,
    /// Running
    InProgress,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Not needed
    Skipped,
}

/// Named sub-task with its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    /// Display name
    pub name: String,
    /// Current status
    pub status: SubTaskStatus,
}

/// Delivery pipeline progress snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Current phase name (e.g. "build", "deploy")
    pub phase: String,
    /// Percent complete, 0..=100
    #[serde(deserialize_with = "percent::deserialize")]
    pub percent: u8,
    /// Human readable status line
    pub message: String,
    /// Sub-task breakdown
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Waiting for work
    Idle,
    /// Calling the model
    Thinking,
    /// Producing output
    Working,
    /// Done
    Completed,
    /// Gave up
    Failed,
}

/// Participant/agent status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStatusUpdate {
    /// Participant identifier
    pub participant_id: String,
    /// Display name
    pub name: String,
    /// New status
    pub status: AgentStatus,
    /// Task currently being worked on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Task progress, 0..=100
    #[serde(
        default,
        deserialize_with = "percent::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<u8>,
}

/// Incremental generated content for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDelta {
    /// File path the content belongs to
    pub file: String,
    /// Text to append
    pub content: String,
    /// Optional unified diff for the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Agent that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Full replacement content for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentReplace {
    /// File path
    pub file: String,
    /// New content
    pub content: String,
    /// Agent that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Error reported by a producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Machine readable code
    pub code: String,
    /// Human readable message
    pub message: String,
    /// Whether the producer will carry on
    pub recoverable: bool,
}

/// Free-form message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role ("system", "assistant", an agent name, ...)
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System notice
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Deliberation participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Executive role (e.g. "CFO")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Deliberation roster and round limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInit {
    /// Current round (1-based)
    pub round: u32,
    /// Maximum number of rounds
    pub max_rounds: u32,
    /// Roster
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Round start marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStart {
    /// Round number
    pub round: u32,
}

/// Speaker change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSpeaking {
    /// Participant who now speaks
    pub participant_id: String,
}

/// Streaming text fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelta {
    /// Speaker
    pub participant_id: String,
    /// Fragment to append
    pub text: String,
}

/// Authoritative final message text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageComplete {
    /// Speaker
    pub participant_id: String,
    /// Final text; wins over accumulated deltas
    pub content: String,
}

/// Consensus level change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusUpdate {
    /// Consensus, 0..=100
    #[serde(deserialize_with = "percent::deserialize")]
    pub level: u8,
}

/// Key insights surfaced so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsUpdate {
    /// Insight texts (set semantics on the receiving side)
    #[serde(default)]
    pub insights: Vec<String>,
}

/// A classified decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionClassification {
    /// Decision identifier
    pub id: String,
    /// Short title
    pub title: String,
    /// Category (e.g. "strategic", "operational")
    pub category: String,
    /// Classifier confidence, 0..=100
    #[serde(
        default,
        deserialize_with = "percent::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<u8>,
    /// Why it was classified this way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Deliberation summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Summary text
    pub text: String,
    /// Final recommendation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Consensus reached, 0..=100
    #[serde(
        default,
        deserialize_with = "percent::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub consensus_level: Option<u8>,
    /// Bullet points
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
}

impl Summary {
    /// Summary consisting of text only
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recommendation: None,
            consensus_level: None,
            key_points: Vec::new(),
        }
    }
}

/// Terminal event payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Optional closing summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Producer-specific result document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Percentages arrive from producers as arbitrary JSON numbers (`42.5`,
/// `-3`, `250`); they are rounded and clamped to `0..=100`.
mod percent {
    use serde::{Deserialize, Deserializer};

    pub(super) fn clamp(value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, 100.0) as u8
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(clamp)
    }

    pub(super) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer).map(|value| value.map(clamp))
    }
}
