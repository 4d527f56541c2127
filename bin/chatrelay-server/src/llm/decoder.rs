//! Push-based decoder for the upstream event stream.
//!
//! Feed raw body bytes with [`DeltaDecoder::push`]; each complete line yields
//! at most one [`Frame`].  Partial lines (including split UTF-8 sequences)
//! are buffered until their newline arrives.
//!
//! Line rules:
//! - blank lines and lines not starting with `data:` produce nothing;
//! - `data: [DONE]` produces [`Frame::Done`] and ends decoding;
//! - any other `data:` payload is parsed as JSON.  Unparseable payloads are
//!   [`Frame::Malformed`] and are skipped by the caller, never fatal;
//! - a line longer than [`MAX_LINE_BYTES`] is one [`Frame::Malformed`]; the
//!   rest of it is dropped up to its newline.

use crate::llm::wire::StreamChunk;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound on a buffered, not yet terminated line.
pub const MAX_LINE_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-empty text fragment.
    Delta(String),
    /// Well-formed payload without text (role preamble, finish reason, ...).
    Empty,
    /// Payload that is not valid JSON.
    Malformed,
    /// End-of-stream sentinel.
    Done,
}

#[derive(Debug, Default)]
pub struct DeltaDecoder {
    pending: Vec<u8>,
    /// Inside an oversized line that was already reported.
    skipping: bool,
    done: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once the end sentinel has been seen.  Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume a chunk of body bytes and return the frames of every line it
    /// completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }
        let mut chunk = chunk;
        if self.skipping {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(newline) => {
                    self.skipping = false;
                    chunk = &chunk[newline + 1..];
                }
                None => return frames,
            }
        }
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let decoded = decode_line(&String::from_utf8_lossy(&self.pending[start..end]));
            start = end + 1;
            if let Some(frame) = decoded {
                let finished = frame == Frame::Done;
                frames.push(frame);
                if finished {
                    self.done = true;
                    self.pending.clear();
                    return frames;
                }
            }
        }
        self.pending.drain(..start);
        if self.pending.len() > MAX_LINE_BYTES {
            self.pending.clear();
            self.skipping = true;
            frames.push(Frame::Malformed);
        }
        frames
    }

    /// Decode a trailing line that was not newline-terminated before the
    /// connection closed.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.done || self.skipping || self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        let frame = decode_line(&line);
        if frame == Some(Frame::Done) {
            self.done = true;
        }
        frame
    }
}

/// Classify a single line.  `None` for lines the protocol ignores.
pub fn decode_line(line: &str) -> Option<Frame> {
    let data = line.trim().strip_prefix(DATA_PREFIX)?.trim();
    if data == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    let frame = match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => match chunk.first_delta() {
            Some(text) if !text.is_empty() => Frame::Delta(text),
            _ => Frame::Empty,
        },
        Err(_) => Frame::Malformed,
    };
    Some(frame)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
