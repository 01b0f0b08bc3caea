#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vidrag::config::{Prompts, Settings};
use vidrag::embedding::{EmbedIntent, Embedder};
use vidrag::knowledge_base::{IndexPolicy, KnowledgeBase, MemoryVectorIndex};
use vidrag::llm::LanguageModel;
use vidrag::pipeline::Pipeline;
use vidrag::source::VideoReference;
use vidrag::transcript::{
    FetchOutcome, TranscriptChain, TranscriptFragment, TranscriptKind, TranscriptSource,
};
use vidrag::{Result, VidragError};

pub const DIMENSIONS: usize = 32;

/// Bag-of-words embedding: each lowercase word bumps one bucket.
pub struct WordEmbedder {
    pub intents: Mutex<Vec<EmbedIntent>>,
    fail: Option<String>,
}

impl WordEmbedder {
    pub fn new() -> Self {
        Self {
            intents: Mutex::new(Vec::new()),
            fail: None,
        }
    }

    /// Fails whenever the text contains `word`.
    pub fn failing_on(word: &str) -> Self {
        Self {
            intents: Mutex::new(Vec::new()),
            fail: Some(word.to_string()),
        }
    }
}

pub fn bucket(word: &str) -> usize {
    word
        .bytes()
        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % DIMENSIONS
}

#[async_trait]
impl Embedder for WordEmbedder {
    async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>> {
        self.intents.lock().unwrap().push(intent);
        if let Some(word) = &self.fail {
            if text.contains(word.as_str()) {
                return Err(VidragError::Embedding("embedding service unavailable".to_string()));
            }
        }

        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Replies with a fixed answer and records each prompt.
pub struct ScriptedModel {
    pub prompts: Mutex<Vec<String>>,
    reply: Option<String>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: Some(reply.to_string()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self
            .reply
            .clone()
            .ok_or_else(|| VidragError::OpenAI("model unavailable".to_string()))
    }
}

/// Serves canned transcripts keyed by YouTube id.
pub struct CannedTranscripts {
    kind: TranscriptKind,
    transcripts: HashMap<String, Vec<TranscriptFragment>>,
    pub calls: AtomicUsize,
}

impl CannedTranscripts {
    pub fn new(kind: TranscriptKind) -> Self {
        Self {
            kind,
            transcripts: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, video_id: &str, fragments: Vec<TranscriptFragment>) -> Self {
        self.transcripts.insert(video_id.to_string(), fragments);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptSource for CannedTranscripts {
    fn kind(&self) -> TranscriptKind {
        self.kind
    }

    async fn fetch(&self, reference: &VideoReference) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let VideoReference::YouTube { id } = reference else {
            return Ok(FetchOutcome::NotFound("not a YouTube video".to_string()));
        };
        Ok(match self.transcripts.get(id) {
            Some(fragments) => FetchOutcome::Found(fragments.clone()),
            None => FetchOutcome::NotFound(format!("no {} captions", self.kind)),
        })
    }
}

pub const COOKING_ID: &str = "c00kingVid1";
pub const ROCKETS_ID: &str = "r0cketsVid2";
pub const SILENT_ID: &str = "si1entVid03";

pub fn fragment(text: &str, start: f64, end: f64) -> TranscriptFragment {
    TranscriptFragment::new(text, start, end)
}

/// Three chunks' worth of cooking talk.
pub fn cooking_transcript() -> Vec<TranscriptFragment> {
    vec![
        fragment("Welcome to the kitchen.", 0.0, 12.0),
        fragment("Today we bake sourdough bread.", 12.0, 31.0),
        fragment("First feed the starter with flour and water.", 31.0, 50.0),
        fragment("Let the starter rise overnight.", 50.0, 65.0),
        fragment("Bake the bread at a high oven temperature.", 65.0, 80.0),
    ]
}

pub fn rockets_transcript() -> Vec<TranscriptFragment> {
    vec![
        fragment("Rockets need thrust to reach orbit.", 0.0, 20.0),
        fragment("Liquid fuel engines burn propellant.", 20.0, 40.0),
    ]
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub kb: Arc<KnowledgeBase>,
    pub embedder: Arc<WordEmbedder>,
    pub model: Arc<ScriptedModel>,
    pub manual: Arc<CannedTranscripts>,
    pub auto: Arc<CannedTranscripts>,
}

pub struct HarnessBuilder {
    policy: IndexPolicy,
    embedder: WordEmbedder,
    model: ScriptedModel,
    manual: CannedTranscripts,
    auto: CannedTranscripts,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            policy: IndexPolicy::Replace,
            embedder: WordEmbedder::new(),
            model: ScriptedModel::replying("Feed the starter, then bake."),
            manual: CannedTranscripts::new(TranscriptKind::Manual).with(COOKING_ID, cooking_transcript()),
            auto: CannedTranscripts::new(TranscriptKind::Auto)
                .with(ROCKETS_ID, rockets_transcript())
                .with(SILENT_ID, Vec::new()),
        }
    }

    pub fn policy(mut self, policy: IndexPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn embedder(mut self, embedder: WordEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn model(mut self, model: ScriptedModel) -> Self {
        self.model = model;
        self
    }

    pub async fn build(self) -> Harness {
        let mut settings = Settings::default();
        settings.knowledge_base.policy = self.policy;

        let kb = Arc::new(
            KnowledgeBase::open(Arc::new(MemoryVectorIndex::new()), "video_rag")
                .await
                .unwrap(),
        );
        let embedder = Arc::new(self.embedder);
        let model = Arc::new(self.model);
        let manual = Arc::new(self.manual);
        let auto = Arc::new(self.auto);

        let transcripts = TranscriptChain::new(vec![
            manual.clone() as Arc<dyn TranscriptSource>,
            auto.clone() as Arc<dyn TranscriptSource>,
        ]);

        let pipeline = Pipeline::with_components(
            &settings,
            Prompts::default(),
            transcripts,
            embedder.clone(),
            model.clone(),
            kb.clone(),
        );

        Harness {
            pipeline,
            kb,
            embedder,
            model,
            manual,
            auto,
        }
    }
}
