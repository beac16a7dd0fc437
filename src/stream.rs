// src/stream.rs
//! Incremental decoder for the execution service's `data: <json>` line stream.
//!
//! Chunks may split lines and multi-byte characters anywhere. The decoder keeps
//! the undecoded tail and the unterminated line between calls, so feeding a body
//! in one piece or in arbitrary pieces yields the same events.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::time::Duration;

use crate::errors::{ClientError, Result};
use crate::models::ResultEvent;

pub const DATA_PREFIX: &str = "data: ";

pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// What became of one complete line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Event(ResultEvent),
    /// A `data:` line whose payload did not parse.
    Malformed { line: String, reason: String },
}

#[derive(Debug, Default)]
pub struct EventDecoder {
    /// Bytes of a character that has not fully arrived yet.
    pending_bytes: Vec<u8>,
    /// Text after the last newline; never contains one between calls.
    carry: String,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the outcome of every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<LineOutcome> {
        // The carry never holds a newline between calls, so only new text needs searching.
        let searched_from = self.carry.len();
        self.decode_utf8(chunk);

        let Some(offset) = self.carry[searched_from..].rfind('\n') else {
            return Vec::new();
        };
        let last_newline = searched_from + offset;
        let rest = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        complete.split('\n').filter_map(parse_line).collect()
    }

    /// Ends the stream. Anything not terminated by a newline is dropped; returns its size in bytes.
    pub fn finish(self) -> usize {
        self.carry.len() + self.pending_bytes.len()
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);
        let mut input = std::mem::take(&mut self.pending_bytes);
        let mut start = 0;

        loop {
            match std::str::from_utf8(&input[start..]) {
                Ok(text) => {
                    self.carry.push_str(text);
                    return;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&input[start..valid_end]) {
                        self.carry.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            self.carry.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Truncated sequence at the end of the chunk: wait for the rest.
                            self.pending_bytes = input.split_off(valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn parse_line(raw: &str) -> Option<LineOutcome> {
    let line = raw.trim();
    let payload = line.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str::<ResultEvent>(payload) {
        Ok(event) => Some(LineOutcome::Event(event)),
        Err(e) => Some(LineOutcome::Malformed {
            line: line.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Adapts a byte stream into a stream of events.
///
/// Malformed lines are logged and skipped. A read error is yielded once and ends the stream.
pub fn decode_events(body: ByteStream) -> impl Stream<Item = Result<ResultEvent>> {
    struct State {
        body: ByteStream,
        decoder: Option<EventDecoder>,
    }

    let state = State { body, decoder: Some(EventDecoder::new()) };

    stream::unfold(state, |mut state| async move {
        let decoder = state.decoder.as_mut()?;
        let item = match state.body.next().await {
            Some(Ok(chunk)) => Ok(decoder.push(&chunk)),
            Some(Err(e)) => {
                state.decoder = None;
                Err(e)
            }
            None => {
                if let Some(decoder) = state.decoder.take() {
                    let dropped = decoder.finish();
                    if dropped > 0 {
                        log::debug!("Discarding {} unterminated bytes at end of stream", dropped);
                    }
                }
                return None;
            }
        };
        Some((item, state))
    })
    .flat_map(|item| {
        let events: Vec<Result<ResultEvent>> = match item {
            Ok(outcomes) => outcomes.into_iter().filter_map(accept_outcome).map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(events)
    })
}

/// Fails the stream with [`ClientError::Timeout`] when no chunk arrives for `idle`.
pub fn with_idle_timeout(body: ByteStream, idle: Duration) -> ByteStream {
    stream::unfold(Some(body), move |body| async move {
        let mut body = body?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(body))),
            Ok(None) => None,
            Err(_) => {
                let err = ClientError::Timeout {
                    endpoint: "result stream".to_string(),
                    after: idle,
                };
                Some((Err(err), None))
            }
        }
    })
    .boxed()
}

/// Logs malformed lines and passes events through.
pub fn accept_outcome(outcome: LineOutcome) -> Option<ResultEvent> {
    match outcome {
        LineOutcome::Event(event) => Some(event),
        LineOutcome::Malformed { line, reason } => {
            log::warn!("Skipping malformed result line {:?}: {}", line, reason);
            None
        }
    }
}
