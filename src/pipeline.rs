//! Pipeline coordination.
//!
//! `process` takes a video from reference to indexed chunks; `ask` answers a
//! question from whatever the knowledge base currently holds.

use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, VidragError};
use crate::indexer::Indexer;
use crate::knowledge_base::{open_index, IndexedVideo, KnowledgeBase};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::retriever::{RetrievalResult, Retriever};
use crate::segmenter;
use crate::source::VideoReference;
use crate::synthesizer::{Answer, AnswerSynthesizer};
use crate::transcript::TranscriptChain;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of processing one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResult {
    pub video_label: String,
    /// Zero when the transcript produced no usable content.
    pub chunk_count: usize,
}

/// The video question-answering pipeline.
pub struct Pipeline {
    transcripts: TranscriptChain,
    min_duration: f64,
    top_k: usize,
    kb: Arc<KnowledgeBase>,
    indexer: Indexer,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl Pipeline {
    /// Create a pipeline backed by OpenAI and the configured knowledge base.
    pub async fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let transcripts = TranscriptChain::from_settings(&settings.transcript, &temp_dir)?;
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::from_settings(&settings.rag)?);

        let index = open_index(&settings.knowledge_base, &settings.sqlite_path())?;
        let kb = Arc::new(KnowledgeBase::open(index, &settings.knowledge_base.collection).await?);

        Ok(Self::with_components(settings, prompts, transcripts, embedder, llm, kb))
    }

    /// Create a pipeline from explicit collaborators.
    pub fn with_components(
        settings: &Settings,
        prompts: Prompts,
        transcripts: TranscriptChain,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        kb: Arc<KnowledgeBase>,
    ) -> Self {
        let indexer = Indexer::new(embedder.clone(), kb.clone(), settings.knowledge_base.policy)
            .with_max_concurrent(settings.embedding.max_concurrent);

        Self {
            transcripts,
            min_duration: settings.segmenter.min_duration_seconds,
            top_k: settings.rag.top_k,
            retriever: Retriever::new(embedder, kb.clone()),
            synthesizer: AnswerSynthesizer::new(llm, prompts),
            indexer,
            kb,
        }
    }

    /// Acquire a transcript for `input`, segment it, and index it under `video_label`.
    #[instrument(skip(self))]
    pub async fn process(&self, input: &str, video_label: &str) -> Result<ProcessResult> {
        checked_label(video_label)?;

        let reference = VideoReference::parse(input)
            .map_err(|e| VidragError::Acquisition(e.to_string()))?;
        self.process_reference(&reference, video_label).await
    }

    /// Like [`Pipeline::process`], for an already parsed reference.
    #[instrument(skip(self), fields(video = %reference))]
    pub async fn process_reference(
        &self,
        reference: &VideoReference,
        video_label: &str,
    ) -> Result<ProcessResult> {
        let video_label = checked_label(video_label)?;

        info!("Fetching transcript");
        let fragments = self.transcripts.fetch(reference).await?;

        let chunks = segmenter::group(&fragments, self.min_duration);
        info!("Grouped {} fragments into {} chunks", fragments.len(), chunks.len());

        let chunk_count = self.indexer.index(video_label, &chunks).await?;

        Ok(ProcessResult {
            video_label: video_label.to_string(),
            chunk_count,
        })
    }

    /// Answer a question from the knowledge base.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with(question, self.top_k, None).await
    }

    /// Answer a question using `k` results, optionally from one video only.
    pub async fn ask_with(
        &self,
        question: &str,
        k: usize,
        video_label: Option<&str>,
    ) -> Result<Answer> {
        let results = self.retriever.retrieve_filtered(question, k, video_label).await?;
        self.synthesizer.synthesize(question, &results).await
    }

    /// Ranked records for a query, without synthesis.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        video_label: Option<&str>,
    ) -> Result<RetrievalResult> {
        self.retriever.retrieve_filtered(query, k, video_label).await
    }

    /// Videos currently queryable.
    pub async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        self.kb.list_videos().await
    }
}

/// Trimmed label, or `InvalidInput` when nothing is left.
fn checked_label(video_label: &str) -> Result<&str> {
    let video_label = video_label.trim();
    if video_label.is_empty() {
        return Err(VidragError::InvalidInput(
            "Video label must not be empty".to_string(),
        ));
    }
    Ok(video_label)
}
