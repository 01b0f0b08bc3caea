//! Merges fine-grained transcript fragments into search-sized chunks.
//!
//! Fragments are accumulated in order until the open chunk spans at least
//! `min_duration` seconds. A fragment is never split across chunks, and the
//! trailing chunk is kept even when it is shorter than `min_duration`.

use crate::transcript::TranscriptFragment;
use serde::{Deserialize, Serialize};

/// Default minimum chunk span in seconds.
pub const DEFAULT_MIN_DURATION: f64 = 30.0;

/// A merged, timestamped block of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text of every fragment in the chunk, space separated and trimmed.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
}

impl Chunk {
    /// Duration of this chunk in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Start as `H:MM:SS`.
    pub fn start(&self) -> String {
        format_timestamp(self.start_seconds)
    }

    /// End as `H:MM:SS`.
    pub fn end(&self) -> String {
        format_timestamp(self.end_seconds)
    }
}

/// Group `fragments` into chunks spanning at least `min_duration` seconds.
///
/// An empty input yields an empty output.
pub fn group(fragments: &[TranscriptFragment], min_duration: f64) -> Vec<Chunk> {
    let Some(first) = fragments.first() else {
        return Vec::new();
    };

    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut chunk_start = first.start;

    for fragment in fragments {
        text.push_str(&fragment.text);
        text.push(' ');

        if fragment.end - chunk_start >= min_duration {
            chunks.push(Chunk {
                text: text.trim().to_string(),
                start_seconds: chunk_start,
                end_seconds: fragment.end,
            });
            text.clear();
            chunk_start = fragment.end;
        }
    }

    if !text.is_empty() {
        if let Some(last) = fragments.last() {
            chunks.push(Chunk {
                text: text.trim().to_string(),
                start_seconds: chunk_start,
                end_seconds: last.end,
            });
        }
    }

    chunks
}

/// Format seconds as `H:MM:SS`; fractional seconds are truncated.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{}:{:02}:{:02}", hours, minutes, secs)
}
