//! Conclave Stream - the viewer side of Conclave live streams
//!
//! Turns an HTTP event stream back into typed events:
//! - Decoder: incremental UTF-8 line reassembly across arbitrary chunking
//! - Frame: classification of a single line (event, comment, malformed)
//! - Source: where the bytes come from (`HttpSource` for real servers)
//! - Consumer: the reconnecting background reader with cancellation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod source;

pub use config::ConsumerConfig;
pub use consumer::{ConnectionStatus, ConsumerEvent, ConsumerHandle, StreamConsumer};
pub use decoder::{EventDecoder, LineDecoder};
pub use error::{Error, Result};
pub use frame::{parse_line, FrameError, Line};
pub use source::{ByteSource, ByteStream, HttpSource};
