//! Similarity search over the knowledge base.

use crate::embedding::{EmbedIntent, Embedder};
use crate::error::{Result, VidragError};
use crate::knowledge_base::{KnowledgeBase, ScoredRecord};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of results returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 5;

/// Ranked records for one question, most similar first.
pub type RetrievalResult = Vec<ScoredRecord>;

/// Finds the stored chunks closest to a question.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    kb: Arc<KnowledgeBase>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, kb: Arc<KnowledgeBase>) -> Self {
        Self { embedder, kb }
    }

    /// Up to `k` records ranked by similarity to `question`.
    ///
    /// An empty knowledge base yields an empty result.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        self.retrieve_filtered(question, k, None).await
    }

    /// Like [`Retriever::retrieve`], restricted to one video when a label is given.
    #[instrument(skip(self, question))]
    pub async fn retrieve_filtered(
        &self,
        question: &str,
        k: usize,
        video_label: Option<&str>,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(question, EmbedIntent::Query)
            .await
            .map_err(|e| VidragError::Retrieval(e.to_string()))?;

        let results = self
            .kb
            .query(&embedding, k, video_label)
            .await
            .map_err(|e| VidragError::Retrieval(e.to_string()))?;

        debug!("Retrieved {} records", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{test_record, MemoryVectorIndex};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed vector and remembers each intent it was asked for.
    struct FixedEmbedder {
        vector: Vec<f32>,
        intents: Mutex<Vec<EmbedIntent>>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str, intent: EmbedIntent) -> Result<Vec<f32>> {
            self.intents.lock().unwrap().push(intent);
            Ok(self.vector.clone())
        }

        fn dimensions(&self) -> usize {
            self.vector.len()
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str, _intent: EmbedIntent) -> Result<Vec<f32>> {
            Err(VidragError::OpenAI("rate limited".to_string()))
        }

        fn dimensions(&self) -> usize {
            0
        }
    }

    async fn knowledge_base() -> Arc<KnowledgeBase> {
        Arc::new(
            KnowledgeBase::open(Arc::new(MemoryVectorIndex::new()), "video_rag")
                .await
                .unwrap(),
        )
    }

    fn fixed(vector: Vec<f32>) -> Arc<FixedEmbedder> {
        Arc::new(FixedEmbedder {
            vector,
            intents: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_empty_knowledge_base_returns_nothing() {
        let retriever = Retriever::new(fixed(vec![1.0, 0.0]), knowledge_base().await);
        let results = retriever.retrieve("anything?", DEFAULT_TOP_K).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_are_ranked_and_capped() {
        let kb = knowledge_base().await;
        kb.replace(&[
            test_record("demo", 0, vec![0.0, 1.0]),
            test_record("demo", 1, vec![1.0, 0.0]),
            test_record("demo", 2, vec![0.7, 0.7]),
        ])
        .await
        .unwrap();

        let embedder = fixed(vec![1.0, 0.0]);
        let retriever = Retriever::new(embedder.clone(), kb);

        let results = retriever.retrieve("q", 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["demo_chunk_1", "demo_chunk_2", "demo_chunk_0"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let top = retriever.retrieve("q", 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].record.id, "demo_chunk_1");

        assert_eq!(
            *embedder.intents.lock().unwrap(),
            vec![EmbedIntent::Query, EmbedIntent::Query]
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_error() {
        let retriever = Retriever::new(Arc::new(FailingEmbedder), knowledge_base().await);
        let err = retriever.retrieve("q", 5).await.unwrap_err();
        assert!(matches!(err, VidragError::Retrieval(_)));
    }
}
