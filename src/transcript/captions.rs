//! YouTube captions via yt-dlp.
//!
//! Captions are requested in YouTube's `json3` format, which carries
//! millisecond timings per caption event.

use super::{FetchOutcome, TranscriptFragment, TranscriptKind, TranscriptSource};
use crate::error::{Result, VidragError};
use crate::source::VideoReference;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Caption track fetcher for either uploader-written or auto-generated captions.
pub struct CaptionSource {
    automatic: bool,
    language: String,
}

impl CaptionSource {
    /// Uploader-written captions.
    pub fn manual(language: &str) -> Self {
        Self {
            automatic: false,
            language: language.to_string(),
        }
    }

    /// Platform-generated captions.
    pub fn automatic(language: &str) -> Self {
        Self {
            automatic: true,
            language: language.to_string(),
        }
    }

    async fn download_track(&self, url: &str, key: &str, dir: &Path) -> Result<Option<PathBuf>> {
        let template = dir.join(format!("{}.%(ext)s", key));
        let write_flag = if self.automatic {
            "--write-auto-subs"
        } else {
            "--write-subs"
        };

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg(write_flag)
            .arg("--sub-langs").arg(&self.language)
            .arg("--sub-format").arg("json3")
            .arg("--output").arg(&template)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VidragError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(VidragError::Acquisition(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidragError::Acquisition(format!("yt-dlp failed: {stderr}")));
        }

        // yt-dlp exits successfully and writes nothing when the track is absent.
        let track = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "json3"));

        Ok(track)
    }
}

#[async_trait]
impl TranscriptSource for CaptionSource {
    fn kind(&self) -> TranscriptKind {
        if self.automatic {
            TranscriptKind::Auto
        } else {
            TranscriptKind::Manual
        }
    }

    #[instrument(skip(self), fields(kind = %self.kind(), video = %reference))]
    async fn fetch(&self, reference: &VideoReference) -> Result<FetchOutcome> {
        if matches!(reference, VideoReference::Local { .. }) {
            return Ok(FetchOutcome::NotFound(
                "local files carry no caption tracks".to_string(),
            ));
        }

        let temp_dir = tempfile::tempdir()?;
        let track = self
            .download_track(&reference.location(), &reference.key(), temp_dir.path())
            .await?;

        let Some(track) = track else {
            return Ok(FetchOutcome::NotFound(format!(
                "no {} captions in '{}'",
                self.kind(),
                self.language
            )));
        };

        let content = tokio::fs::read_to_string(&track).await?;
        let fragments = parse_json3(&content)?;
        debug!("Parsed {} caption fragments", fragments.len());

        Ok(FetchOutcome::Found(fragments))
    }
}

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` caption track into time-ordered, non-overlapping fragments.
///
/// Events without text are dropped. Auto-generated tracks overlap each
/// rolling line with the next; an overlapping fragment is cut off where the
/// next one starts.
pub fn parse_json3(content: &str) -> Result<Vec<TranscriptFragment>> {
    let track: Json3Track = serde_json::from_str(content)?;

    let mut fragments: Vec<TranscriptFragment> = track
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            let start = event.t_start_ms as f64 / 1000.0;
            let end = (event.t_start_ms + event.d_duration_ms) as f64 / 1000.0;
            Some(TranscriptFragment::new(text, start, end))
        })
        .collect();

    fragments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    for i in 1..fragments.len() {
        let next_start = fragments[i].start;
        let current = &mut fragments[i - 1];
        if current.end > next_start {
            current.end = next_start.max(current.start);
        }
    }

    Ok(fragments)
}
