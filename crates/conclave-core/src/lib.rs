//! Conclave Core - live progress distribution
//!
//! This crate provides the server-side half of Conclave live streams,
//! including:
//! - Event: the typed envelope and event kinds carried end to end
//! - Broker: the channel registry with bounded replay history
//! - Transport: the framed push stream handed to HTTP connections
//! - State: pure reconstructors that fold events into discussion or
//!   delivery-progress state

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod config;
pub mod error;
pub mod event;
pub mod state;
pub mod transport;

pub use broker::{ChannelInfo, ChannelRegistry, DeliverFn, SubscriberInfo};
pub use config::{BrokerConfig, TransportConfig};
pub use error::{DeliveryError, Error, Result};
pub use event::{
    AgentStatus, ChannelInit, ChatMessage, Completion, ConsensusUpdate, ContentReplace,
    DecisionClassification, ErrorReport, Event, EventKind, InsightsUpdate, MessageComplete,
    MessageDelta, Participant, ParticipantSpeaking, ParticipantStatusUpdate, ProgressUpdate,
    RoundStart, SubTask, SubTaskStatus, Summary, TextDelta,
};
pub use state::{
    Applied, DiscussionMessage, DiscussionState, GeneratedFile, LogLine, ProgressState, Reduce,
    Reconstructor,
};
pub use transport::{encode_frame, EventStream, Frame, DATA_PREFIX, KEEP_ALIVE_FRAME};
