//! Human-readable message log.
//!
//! A bounded, most-recent-first list of display lines describing traffic
//! and connection changes. It is a debugging surface, separate from the
//! structured `tracing` output.

use serde_json::Value;
use std::collections::VecDeque;
use tmir_state::Decoded;

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Serialized payloads shorter than this are shown inline after the label.
const INLINE_LIMIT: usize = 100;
const PREVIEW_CHARS: usize = 150;
const RAW_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct MessageLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Prepend a line stamped with the local wall-clock time, evicting the
    /// oldest line once over capacity.
    pub fn push(&mut self, line: impl AsRef<str>) {
        if self.capacity == 0 {
            return;
        }
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.lines.push_front(format!("{stamp} {}", line.as_ref()));
        self.lines.truncate(self.capacity);
    }

    /// Newest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `<- kind` for a decoded frame, with the payload appended when short.
pub fn inbound_line(decoded: &Decoded) -> String {
    let label = decoded.declared_kind.as_deref().unwrap_or("message");
    let json = compact(&decoded.raw);
    let preview = truncate_chars(&json, PREVIEW_CHARS);
    if preview.chars().count() < INLINE_LIMIT {
        format!("<- {label}: {preview}")
    } else {
        format!("<- {label}")
    }
}

/// A frame that could not be decoded.
pub fn raw_line(frame: &str) -> String {
    format!("<raw> {}", truncate_chars(frame, RAW_CHARS))
}

pub fn outbound_line(json: &str) -> String {
    format!("-> {}", truncate_chars(json, RAW_CHARS))
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
