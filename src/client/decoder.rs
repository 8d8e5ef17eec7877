use serde::Deserialize;

use crate::models::WireEvent;
use crate::relay::DONE_SENTINEL;

const DATA_PREFIX: &str = "data: ";

/// What one `data: ` line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Event(WireEvent),
    Done,
}

#[derive(Deserialize)]
struct IncomingEvent {
    content: Option<String>,
    reasoning_content: Option<String>,
}

/// Incremental decoder for the relay's event stream.
///
/// Bytes may arrive split anywhere, including inside a multi-byte character
/// or in the middle of a line. Incomplete UTF-8 sequences and the trailing
/// partial line are carried over to the next `push`.
#[derive(Debug, Default)]
pub struct EventDecoder {
    pending: Vec<u8>,
    line: String,
    malformed: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one read's worth of bytes, returning every frame it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let text = self.decode(bytes);
        self.line.push_str(&text);

        let mut frames = Vec::new();
        while let Some(pos) = self.line.find('\n') {
            let line: String = self.line.drain(..=pos).collect();
            if let Some(frame) = self.parse_line(&line[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<Frame> {
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.line.push_str(&tail);
            self.pending.clear();
        }

        let line = std::mem::take(&mut self.line);
        self.parse_line(&line).into_iter().collect()
    }

    /// Frames skipped because their payload was not valid event JSON.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn parse_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix(DATA_PREFIX)?;

        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        match serde_json::from_str::<IncomingEvent>(payload) {
            Ok(event) => Some(Frame::Event(WireEvent {
                content: event.content.unwrap_or_default(),
                reasoning_content: event.reasoning_content.unwrap_or_default(),
            })),
            Err(e) => {
                self.malformed += 1;
                log::warn!("Skipping malformed event: {} - Data: {}", e, payload);
                None
            }
        }
    }
}
