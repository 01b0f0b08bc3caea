//! OpenAI embeddings implementation.

use super::{EmbedIntent, Embedder};
use crate::config::EmbeddingSettings;
use crate::error::{Result, VidragError};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    document_prefix: Option<String>,
    query_prefix: Option<String>,
}

impl OpenAIEmbedder {
    /// Create an embedder from the embedding settings.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            document_prefix: settings.document_prefix.clone(),
            query_prefix: settings.query_prefix.clone(),
        })
    }

    /// Text actually sent to the model for the given intent.
    fn prepare(&self, text: &str, intent: EmbedIntent) -> String {
        let prefix = match intent {
            EmbedIntent::Document => self.document_prefix.as_deref(),
            EmbedIntent::Query => self.query_prefix.as_deref(),
        };
        match prefix {
            Some(p) => format!("{}{}", p, text),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(intent = ?intent))]
    async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(self.prepare(text, intent)))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| VidragError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| VidragError::OpenAI(format!("Embedding API error: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| VidragError::Embedding("Empty embedding response".to_string()))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
