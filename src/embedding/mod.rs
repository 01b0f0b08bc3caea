//! Embedding generation for indexing and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a text is being embedded for.
///
/// Asymmetric models encode stored passages and search queries differently,
/// so indexing and retrieval must each ask for their own intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedIntent {
    /// Text stored in the knowledge base.
    Document,
    /// A question searched against the knowledge base.
    Query,
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
