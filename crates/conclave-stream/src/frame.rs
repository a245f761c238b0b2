//! Classification of a single decoded line.

use conclave_core::{Event, DATA_PREFIX};
use serde_json::error::Category;
use thiserror::Error;

/// One complete line of the event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// A `data:` line carrying an event
    Event(Event),
    /// A `:` comment (keep-alives)
    Comment(String),
    /// Frame terminator
    Blank,
    /// Any other field (`event:`, `id:`, `retry:`), not used by this protocol
    Other(String),
}

/// Why a `data:` line did not yield an event
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not valid JSON, typically a frame cut short
    #[error("truncated frame: {0}")]
    Truncated(#[source] serde_json::Error),

    /// Well-formed JSON that is not a known event
    #[error("invalid event: {0}")]
    Invalid(#[source] serde_json::Error),
}

impl From<serde_json::Error> for FrameError {
    fn from(error: serde_json::Error) -> Self {
        match error.classify() {
            Category::Data => Self::Invalid(error),
            Category::Syntax | Category::Eof | Category::Io => Self::Truncated(error),
        }
    }
}

/// Classify one line (without its terminator).
pub fn parse_line(line: &str) -> Result<Line, FrameError> {
    if line.is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(comment) = line.strip_prefix(':') {
        return Ok(Line::Comment(comment.trim_start().to_string()));
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => {
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            let event = serde_json::from_str(payload)?;
            Ok(Line::Event(event))
        }
        None => Ok(Line::Other(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::{encode_frame, ChatMessage, EventKind};

    #[test]
    fn test_event_line() {
        let event = Event::new("proj", EventKind::Message(ChatMessage::system("hi")));
        let frame = encode_frame(&event).unwrap();

        let line = parse_line(frame.trim_end_matches('\n')).unwrap();
        assert_eq!(line, Line::Event(event));
    }

    #[test]
    fn test_data_without_space() {
        let line = r#"data:{"id":"1","channelId":"p","timestamp":0,"type":"round_start","data":{"round":2}}"#;
        assert!(matches!(parse_line(line), Ok(Line::Event(e)) if e.kind_name() == "round_start"));
    }

    #[test]
    fn test_comment_blank_and_other() {
        assert_eq!(parse_line(": keep-alive").unwrap(), Line::Comment("keep-alive".to_string()));
        assert_eq!(parse_line("").unwrap(), Line::Blank);
        assert_eq!(
            parse_line("retry: 3000").unwrap(),
            Line::Other("retry: 3000".to_string())
        );
    }

    #[test]
    fn test_truncated_json() {
        let result = parse_line(r#"data: {"id":"1","channelId":"p","#);
        assert!(matches!(result, Err(FrameError::Truncated(_))));
    }

    #[test]
    fn test_well_formed_but_invalid_event() {
        let result = parse_line(r#"data: {"id":"1","channelId":"p","timestamp":0,"type":"teleport","data":{}}"#);
        assert!(matches!(result, Err(FrameError::Invalid(_))));

        let result = parse_line(r#"data: [1, 2, 3]"#);
        assert!(matches!(result, Err(FrameError::Invalid(_))));
    }
}
