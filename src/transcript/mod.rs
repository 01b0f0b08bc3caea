//! Transcript acquisition.
//!
//! A transcript is an ordered list of [`TranscriptFragment`]s. Sources are
//! tried in a configured preference order (manual captions, auto-generated
//! captions, speech recognition); each reports a typed
//! [`FetchOutcome::NotFound`] when it has nothing, and the first one that
//! finds fragments wins.

mod captions;
mod speech;

pub use captions::{parse_json3, CaptionSource};
pub use speech::SpeechSource;

use crate::config::TranscriptSettings;
use crate::error::{Result, VidragError};
use crate::source::VideoReference;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A raw timed piece of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// Kind of transcript a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// Captions written by the uploader.
    Manual,
    /// Captions generated by the video platform.
    Auto,
    /// Local speech recognition over the downloaded audio.
    Speech,
}

impl std::str::FromStr for TranscriptKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(TranscriptKind::Manual),
            "auto" => Ok(TranscriptKind::Auto),
            "speech" | "whisper" => Ok(TranscriptKind::Speech),
            _ => Err(format!("Unknown transcript kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptKind::Manual => write!(f, "manual"),
            TranscriptKind::Auto => write!(f, "auto"),
            TranscriptKind::Speech => write!(f, "speech"),
        }
    }
}

/// Result of asking one source for a transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(Vec<TranscriptFragment>),
    /// The source has no transcript for this video; the reason is kept for reporting.
    NotFound(String),
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// The kind of transcript this source yields.
    fn kind(&self) -> TranscriptKind;

    /// Fetch the transcript for a video.
    ///
    /// A missing transcript is `Ok(FetchOutcome::NotFound)`; `Err` is reserved
    /// for failures such as a missing tool or an API error.
    async fn fetch(&self, reference: &VideoReference) -> Result<FetchOutcome>;
}

/// Ordered list of transcript sources tried until one succeeds.
pub struct TranscriptChain {
    sources: Vec<Arc<dyn TranscriptSource>>,
}

impl TranscriptChain {
    /// Create a chain trying `sources` in order.
    pub fn new(sources: Vec<Arc<dyn TranscriptSource>>) -> Self {
        Self { sources }
    }

    /// Build the chain described by the transcript settings.
    pub fn from_settings(settings: &TranscriptSettings, temp_dir: &Path) -> Result<Self> {
        let mut sources: Vec<Arc<dyn TranscriptSource>> = Vec::new();

        for kind in &settings.preference {
            let source: Arc<dyn TranscriptSource> = match kind {
                TranscriptKind::Manual => {
                    Arc::new(CaptionSource::manual(&settings.caption_language))
                }
                TranscriptKind::Auto => {
                    Arc::new(CaptionSource::automatic(&settings.caption_language))
                }
                TranscriptKind::Speech => Arc::new(SpeechSource::new(settings, temp_dir)?),
            };
            sources.push(source);
        }

        if sources.is_empty() {
            return Err(VidragError::Config(
                "transcript.preference must name at least one source".to_string(),
            ));
        }

        Ok(Self::new(sources))
    }

    /// Fetch a transcript from the first source that has one.
    #[instrument(skip(self), fields(video = %reference))]
    pub async fn fetch(&self, reference: &VideoReference) -> Result<Vec<TranscriptFragment>> {
        let mut misses = Vec::new();

        for source in &self.sources {
            match source.fetch(reference).await? {
                FetchOutcome::Found(fragments) if !fragments.is_empty() => {
                    info!(
                        "Using {} transcript ({} fragments)",
                        source.kind(),
                        fragments.len()
                    );
                    return Ok(fragments);
                }
                FetchOutcome::Found(_) => {
                    warn!("{} transcript was empty", source.kind());
                    misses.push(format!("{}: empty transcript", source.kind()));
                }
                FetchOutcome::NotFound(reason) => {
                    warn!("No {} transcript: {}", source.kind(), reason);
                    misses.push(format!("{}: {}", source.kind(), reason));
                }
            }
        }

        Err(VidragError::Acquisition(format!(
            "{} ({})",
            reference,
            misses.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        kind: TranscriptKind,
        outcome: FetchOutcome,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(kind: TranscriptKind, outcome: FetchOutcome) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranscriptSource for FixedSource {
        fn kind(&self) -> TranscriptKind {
            self.kind
        }

        async fn fetch(&self, _reference: &VideoReference) -> Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TranscriptSource for BrokenSource {
        fn kind(&self) -> TranscriptKind {
            TranscriptKind::Speech
        }

        async fn fetch(&self, _reference: &VideoReference) -> Result<FetchOutcome> {
            Err(VidragError::ToolNotFound("yt-dlp".to_string()))
        }
    }

    fn reference() -> VideoReference {
        VideoReference::YouTube {
            id: "dQw4w9WgXcQ".to_string(),
        }
    }

    #[tokio::test]
    async fn test_chain_falls_back_in_order() {
        let manual = FixedSource::new(
            TranscriptKind::Manual,
            FetchOutcome::NotFound("no manual captions".to_string()),
        );
        let auto = FixedSource::new(
            TranscriptKind::Auto,
            FetchOutcome::Found(vec![TranscriptFragment::new("hello", 0.0, 2.0)]),
        );
        let speech = FixedSource::new(TranscriptKind::Speech, FetchOutcome::Found(vec![]));

        let chain = TranscriptChain::new(vec![manual.clone(), auto.clone(), speech.clone()]);
        let fragments = chain.fetch(&reference()).await.unwrap();

        assert_eq!(fragments, vec![TranscriptFragment::new("hello", 0.0, 2.0)]);
        assert_eq!(manual.calls.load(Ordering::SeqCst), 1);
        assert_eq!(auto.calls.load(Ordering::SeqCst), 1);
        assert_eq!(speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_reports_every_miss() {
        let chain = TranscriptChain::new(vec![
            FixedSource::new(TranscriptKind::Manual, FetchOutcome::NotFound("none".into())),
            FixedSource::new(TranscriptKind::Auto, FetchOutcome::Found(vec![])),
        ]);

        match chain.fetch(&reference()).await {
            Err(VidragError::Acquisition(msg)) => {
                assert!(msg.contains("manual: none"));
                assert!(msg.contains("auto: empty transcript"));
            }
            other => panic!("expected acquisition failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chain_propagates_hard_errors() {
        let chain = TranscriptChain::new(vec![Arc::new(BrokenSource)]);
        let result = chain.fetch(&reference()).await;
        assert!(matches!(result, Err(VidragError::ToolNotFound(_))));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Manual".parse::<TranscriptKind>(), Ok(TranscriptKind::Manual));
        assert_eq!("whisper".parse::<TranscriptKind>(), Ok(TranscriptKind::Speech));
        assert!("subtitles".parse::<TranscriptKind>().is_err());
        assert_eq!(TranscriptKind::Auto.to_string(), "auto");
    }
}
