//! Audio extraction for speech recognition.

mod downloader;

pub use downloader::{extract_audio, probe_duration, split_audio};
