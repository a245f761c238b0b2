//! Incremental decoding of a chunked byte stream into lines and events.
//!
//! Chunk boundaries carry no meaning: a chunk may end in the middle of a
//! line, of a JSON document or of a multi-byte character. [`LineDecoder`]
//! holds back whatever is incomplete until the next chunk arrives.

use conclave_core::Event;
use tracing::warn;

use crate::frame::{parse_line, Line};

/// Reassembles UTF-8 lines from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of a character split across chunks
    pending: Vec<u8>,
    /// Decoded text after the last line break
    buffer: String,
}

impl LineDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every line it completed.
    ///
    /// Lines are split on `\n`; a trailing `\r` is stripped. Invalid byte
    /// sequences decode to U+FFFD.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();
        self.take_lines()
    }

    /// Flush at end of stream.
    ///
    /// A dangling partial character becomes U+FFFD and whatever text remains
    /// is returned as a final line.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }
        let mut lines = self.take_lines();
        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            lines.push(strip_cr(&rest).to_string());
        }
        lines
    }

    /// Text buffered after the last complete line
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn decode_pending(&mut self) {
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid = start + e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid]));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid + len;
                        }
                        None => {
                            // Incomplete character at the end; wait for more
                            start = valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }

    fn take_lines(&mut self) -> Vec<String> {
        let Some(last) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete[..last]
            .split('\n')
            .map(|line| strip_cr(line).to_string())
            .collect()
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Decodes events from a chunked byte stream.
///
/// Malformed `data:` lines are logged and dropped; a single bad frame never
/// ends the stream.
#[derive(Debug, Default)]
pub struct EventDecoder {
    lines: LineDecoder,
    dropped: usize,
}

impl EventDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Event> {
        let lines = self.lines.feed(chunk);
        self.events(lines)
    }

    /// Flush at end of stream and return any final event.
    pub fn finish(&mut self) -> Vec<Event> {
        let lines = self.lines.finish();
        self.events(lines)
    }

    /// Number of malformed frames dropped so far
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn events(&mut self, lines: Vec<String>) -> Vec<Event> {
        let mut events = Vec::new();
        for line in lines {
            match parse_line(&line) {
                Ok(Line::Event(event)) => events.push(event),
                Ok(Line::Comment(_) | Line::Blank | Line::Other(_)) => {}
                Err(error) => {
                    self.dropped += 1;
                    warn!(error = %error, line_len = line.len(), "Malformed frame dropped");
                }
            }
        }
        events
    }
}
