//! Speech recognition over the video's audio with OpenAI Whisper.

use super::{FetchOutcome, TranscriptFragment, TranscriptKind, TranscriptSource};
use crate::audio::{extract_audio, probe_duration, split_audio};
use crate::config::TranscriptSettings;
use crate::error::{Result, VidragError};
use crate::openai::create_client;
use crate::source::VideoReference;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Pieces transcribed at once.
const MAX_CONCURRENT_PIECES: usize = 3;

/// Whisper-based transcript source.
pub struct SpeechSource {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    split_seconds: u32,
    max_duration_seconds: u32,
    temp_dir: PathBuf,
}

impl SpeechSource {
    pub fn new(settings: &TranscriptSettings, temp_dir: &Path) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.whisper_model.clone(),
            split_seconds: settings.split_seconds,
            max_duration_seconds: settings.max_duration_seconds,
            temp_dir: temp_dir.to_path_buf(),
        })
    }

    /// Transcribe a single audio file, returning segment-level fragments.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_piece(&self, audio_path: &Path) -> Result<Vec<TranscriptFragment>> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| VidragError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| VidragError::OpenAI(format!("Whisper API error: {}", e)))?;

        let fragments: Vec<TranscriptFragment> = match response.segments {
            Some(segments) => segments
                .iter()
                .map(|s| TranscriptFragment::new(s.text.trim(), s.start as f64, s.end as f64))
                .filter(|f| !f.text.is_empty())
                .collect(),
            None if !response.text.trim().is_empty() => vec![TranscriptFragment::new(
                response.text.trim(),
                0.0,
                response.duration as f64,
            )],
            None => Vec::new(),
        };

        debug!("Transcribed {} segments", fragments.len());
        Ok(fragments)
    }

    async fn transcribe_audio(&self, audio_path: &Path) -> Result<Vec<TranscriptFragment>> {
        let duration = probe_duration(audio_path).await?;
        if duration > self.max_duration_seconds as f64 {
            return Err(VidragError::InvalidInput(format!(
                "Media duration ({:.0} seconds) exceeds maximum ({} seconds)",
                duration, self.max_duration_seconds
            )));
        }

        let pieces_dir = tempfile::tempdir()?;
        let pieces = split_audio(audio_path, pieces_dir.path(), self.split_seconds).await?;
        info!("Transcribing {} audio pieces with {}", pieces.len(), self.model);

        // `buffered` keeps results in piece order.
        let transcribed: Vec<(f64, Vec<TranscriptFragment>)> = stream::iter(pieces)
            .map(|(path, offset)| async move {
                let fragments = self.transcribe_piece(&path).await?;
                Ok::<_, VidragError>((offset, fragments))
            })
            .buffered(MAX_CONCURRENT_PIECES)
            .try_collect()
            .await?;

        Ok(offset_fragments(transcribed))
    }
}

/// Shift each piece's fragments by the piece offset and concatenate.
fn offset_fragments(pieces: Vec<(f64, Vec<TranscriptFragment>)>) -> Vec<TranscriptFragment> {
    pieces
        .into_iter()
        .flat_map(|(offset, fragments)| {
            fragments.into_iter().map(move |mut f| {
                f.start += offset;
                f.end += offset;
                f
            })
        })
        .collect()
}

#[async_trait]
impl TranscriptSource for SpeechSource {
    fn kind(&self) -> TranscriptKind {
        TranscriptKind::Speech
    }

    #[instrument(skip(self), fields(video = %reference))]
    async fn fetch(&self, reference: &VideoReference) -> Result<FetchOutcome> {
        let audio_path = extract_audio(reference, &self.temp_dir).await?;
        let result = self.transcribe_audio(&audio_path).await;

        if let Err(e) = std::fs::remove_file(&audio_path) {
            warn!("Failed to clean up audio file: {}", e);
        }

        let fragments = result?;
        if fragments.is_empty() {
            return Ok(FetchOutcome::NotFound(
                "speech recognition produced no text".to_string(),
            ));
        }

        Ok(FetchOutcome::Found(fragments))
    }
}
