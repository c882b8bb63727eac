//! Server-sent events decoding.

use super::{MAX_BODY_BYTES, body_too_large};
use crate::monitor::ports::{McpSessionError, McpSessionResult};
use std::collections::VecDeque;

const DEFAULT_EVENT: &str = "message";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SseEvent {
    pub(super) event: String,
    pub(super) data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Bytes may be fed in arbitrary chunks; lines split across chunks are
/// buffered until their terminator arrives.
#[derive(Debug, Default)]
pub(super) struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub(super) fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Bytes held for the event being assembled, including any partial line.
    pub(super) fn pending_bytes(&self) -> usize {
        self.buffer.len() + self.data.iter().map(String::len).sum::<usize>()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let trimmed_value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(trimmed_value.to_owned()),
            "data" => self.data.push(trimmed_value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_name = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event_name.unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
            data,
        })
    }
}

/// Event reader over a streaming HTTP response body.
///
/// An event, or an unterminated line, larger than [`MAX_BODY_BYTES`] fails
/// the read.
#[derive(Debug)]
pub(super) struct SseReader {
    response: reqwest::Response,
    parser: SseParser,
    pending: VecDeque<SseEvent>,
}

impl SseReader {
    pub(super) fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            parser: SseParser::default(),
            pending: VecDeque::new(),
        }
    }

    /// Returns the next event, or `None` once the stream has ended.
    pub(super) async fn next_event(&mut self) -> McpSessionResult<Option<SseEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let chunk = self
                .response
                .chunk()
                .await
                .map_err(McpSessionError::connect)?;
            let Some(bytes) = chunk else {
                return Ok(None);
            };
            self.pending.extend(self.parser.feed(&bytes));
            if self.parser.pending_bytes() > MAX_BODY_BYTES {
                return Err(body_too_large());
            }
        }
    }
}
