//! Incremental decoder for streamed chat-completion bodies
//!
//! The endpoint replies with a body of arbitrary byte chunks that together
//! form newline-delimited records:
//!
//! ```text
//! : keep-alive comment
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//! data: [DONE]
//! ```
//!
//! [`StreamDecoder`] accepts chunks in arrival order and yields
//! [`StreamEvent`]s. Only newline-terminated lines are interpreted while the
//! body is still arriving; [`StreamDecoder::finish`] flushes whatever is left
//! once the body ends.
//!
//! # Malformed records
//!
//! A `data:` line whose payload is not valid JSON is pushed back onto the
//! front of the buffer and the rest of the chunk waits for more bytes
//! (a "rewind"). Rewinds on the same line are capped by `max_rewinds`; once
//! the cap is reached the line is dropped with a warning so a permanently
//! broken record cannot stall the stream. The final pass never rewinds.

use serde_json::Value;

/// Prefix that marks a data record
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// JSON pointer to the incremental text inside a record
const DELTA_CONTENT_POINTER: &str = "/choices/0/delta/content";

/// Default number of rewinds allowed for one malformed line
pub const DEFAULT_MAX_REWINDS: u32 = 3;

/// Something the decoder extracted from the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Non-empty text to append to the assistant reply
    Delta(String),
    /// The `[DONE]` sentinel was seen; nothing after it is interpreted
    Done,
}

/// Counters describing one decoded body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// `data:` records parsed as JSON
    pub records: usize,
    /// Records that carried non-empty delta text
    pub deltas: usize,
    /// Comment, blank, and non-data lines
    pub skipped_lines: usize,
    /// Times a malformed line was pushed back into the buffer
    pub rewinds: usize,
    /// Malformed lines given up on
    pub dropped_lines: usize,
    /// Whether the sentinel was observed
    pub done: bool,
}

enum LineOutcome {
    Delta(String),
    Record,
    Skipped,
    Done,
    Malformed,
}

/// UTF-8 decoder that holds back incomplete sequences across chunk boundaries
///
/// Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut input: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + len..];
                        }
                        None => {
                            // Truncated sequence; wait for the next chunk.
                            input = &input[valid..];
                            break;
                        }
                    }
                }
            }
        }

        let rest = input.to_vec();
        self.pending = rest;
        out
    }

    fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Incremental parser for `data:`-framed chat completion bodies
///
/// # Examples
///
/// ```
/// use persona_chat::chat::decoder::{StreamDecoder, StreamEvent};
///
/// let mut decoder = StreamDecoder::default();
/// let mut events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n");
/// events.extend(decoder.feed(b"data: [DONE]\n"));
///
/// assert_eq!(
///     events,
///     vec![StreamEvent::Delta("Hi".to_string()), StreamEvent::Done]
/// );
/// ```
#[derive(Debug)]
pub struct StreamDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    max_rewinds: u32,
    rewind_attempts: u32,
    done: bool,
    stats: StreamStats,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REWINDS)
    }
}

impl StreamDecoder {
    /// Creates a decoder allowing `max_rewinds` retries per malformed line
    ///
    /// `0` drops malformed lines as soon as they are seen.
    pub fn new(max_rewinds: u32) -> Self {
        Self {
            utf8: Utf8Decoder::default(),
            buffer: String::new(),
            max_rewinds,
            rewind_attempts: 0,
            done: false,
            stats: StreamStats::default(),
        }
    }

    /// Feeds the next body chunk and returns the events it completed
    ///
    /// After [`StreamEvent::Done`] has been returned every further call
    /// returns nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }

        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
        self.drain_complete_lines(true)
    }

    /// Flushes buffered text once the body has ended
    ///
    /// A final line without a trailing newline is interpreted here.
    /// Malformed lines are dropped rather than rewound.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }

        let tail = self.utf8.finish();
        self.buffer.push_str(&tail);
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
        self.drain_complete_lines(false)
    }

    /// Whether the `[DONE]` sentinel has been observed
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Counters for everything decoded so far
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn drain_complete_lines(&mut self, allow_rewind: bool) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return events;
        };
        let complete: String = self.buffer.drain(..=last_newline).collect();
        let mut lines = complete[..complete.len() - 1].split('\n');

        while let Some(line) = lines.next() {
            match self.process_line(line) {
                LineOutcome::Delta(text) => {
                    self.rewind_attempts = 0;
                    events.push(StreamEvent::Delta(text));
                }
                LineOutcome::Record | LineOutcome::Skipped => {
                    self.rewind_attempts = 0;
                }
                LineOutcome::Done => {
                    self.done = true;
                    self.stats.done = true;
                    self.buffer.clear();
                    events.push(StreamEvent::Done);
                    return events;
                }
                LineOutcome::Malformed => {
                    if allow_rewind && self.rewind_attempts < self.max_rewinds {
                        self.rewind_attempts += 1;
                        self.stats.rewinds += 1;
                        tracing::debug!(
                            "Rewinding unparsed record (attempt {}/{})",
                            self.rewind_attempts,
                            self.max_rewinds
                        );

                        let mut pending = String::with_capacity(complete.len() + self.buffer.len());
                        pending.push_str(line);
                        pending.push('\n');
                        for rest in lines.by_ref() {
                            pending.push_str(rest);
                            pending.push('\n');
                        }
                        pending.push_str(&self.buffer);
                        self.buffer = pending;
                        return events;
                    }

                    tracing::warn!(
                        "Dropping malformed stream record after {} rewinds: {}",
                        self.rewind_attempts,
                        line
                    );
                    self.rewind_attempts = 0;
                    self.stats.dropped_lines += 1;
                }
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> LineOutcome {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.trim().is_empty() || line.starts_with(':') {
            self.stats.skipped_lines += 1;
            return LineOutcome::Skipped;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            tracing::trace!("Ignoring non-data line: {}", line);
            self.stats.skipped_lines += 1;
            return LineOutcome::Skipped;
        };

        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return LineOutcome::Done;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                self.stats.records += 1;
                match extract_delta(&value) {
                    Some(text) => {
                        self.stats.deltas += 1;
                        LineOutcome::Delta(text.to_string())
                    }
                    None => LineOutcome::Record,
                }
            }
            Err(_) => LineOutcome::Malformed,
        }
    }
}

/// Pulls `choices[0].delta.content` out of a record, ignoring empty text
fn extract_delta(value: &Value) -> Option<&str> {
    value
        .pointer(DELTA_CONTENT_POINTER)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
