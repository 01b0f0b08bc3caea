//! Embeds chunks and writes them to the knowledge base.

use crate::embedding::{EmbedIntent, Embedder};
use crate::error::{Result, VidragError};
use crate::knowledge_base::{IndexPolicy, KnowledgeBase, KnowledgeBaseRecord, RecordMetadata};
use crate::segmenter::Chunk;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Default number of embedding requests in flight.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Turns a video's chunks into knowledge base records.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    kb: Arc<KnowledgeBase>,
    policy: IndexPolicy,
    max_concurrent: usize,
}

impl Indexer {
    /// Create an indexer writing to `kb` under `policy`.
    pub fn new(embedder: Arc<dyn Embedder>, kb: Arc<KnowledgeBase>, policy: IndexPolicy) -> Self {
        Self {
            embedder,
            kb,
            policy,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Set how many embedding requests may run at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Embed `chunks` and store them under `video_label`.
    ///
    /// Returns the number of chunks stored. Every chunk is embedded before
    /// the knowledge base is touched, so a failed embedding leaves the
    /// previous contents queryable.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len(), policy = %self.policy))]
    pub async fn index(&self, video_label: &str, chunks: &[Chunk]) -> Result<usize> {
        let embeddings = self.embed_all(chunks).await?;

        let records: Vec<KnowledgeBaseRecord> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| KnowledgeBaseRecord {
                id: KnowledgeBaseRecord::record_id(video_label, i),
                text: chunk.text.clone(),
                embedding,
                metadata: RecordMetadata {
                    video_label: video_label.to_string(),
                    start_seconds: chunk.start_seconds,
                    end_seconds: chunk.end_seconds,
                    chunk_index: i,
                },
            })
            .collect();

        let written = match self.policy {
            IndexPolicy::Replace => self.kb.replace(&records).await,
            IndexPolicy::Accumulate => self.kb.extend(video_label, &records).await,
        }
        .map_err(|e| VidragError::indexing(records.len(), e))?;

        info!("Indexed {} chunks for {}", written, video_label);
        Ok(written)
    }

    /// Embed every chunk, preserving order.
    ///
    /// On failure the error reports how many chunks, counted from the
    /// start, were embedded before the first failure. A vector whose length
    /// differs from the embedder's dimensions counts as a failure.
    async fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let dimensions = self.embedder.dimensions();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let mut results = stream::iter(texts)
            .map(move |text| {
                let embedder = Arc::clone(&embedder);
                async move { embedder.embed(&text, EmbedIntent::Document).await }
            })
            .buffered(self.max_concurrent);

        let mut embeddings = Vec::with_capacity(chunks.len());
        while let Some(result) = results.next().await {
            match result {
                Ok(embedding) if embedding.len() == dimensions => embeddings.push(embedding),
                Ok(embedding) => {
                    warn!("Embedding {} has {} dimensions", embeddings.len(), embedding.len());
                    return Err(VidragError::indexing(
                        embeddings.len(),
                        format!("expected {} dimensions, got {}", dimensions, embedding.len()),
                    ));
                }
                Err(e) => {
                    warn!("Embedding failed after {} of {} chunks", embeddings.len(), chunks.len());
                    return Err(VidragError::indexing(embeddings.len(), e));
                }
            }
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::MemoryVectorIndex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as its length; fails on "boom" and returns the wrong width for "wide".
    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>> {
            assert_eq!(intent, EmbedIntent::Document);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == "boom" {
                return Err(VidragError::Embedding("provider unavailable".to_string()));
            }
            if text == "wide" {
                return Ok(vec![1.0, 1.0, 1.0]);
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn chunk(text: &str, start: f64, end: f64) -> Chunk {
        Chunk {
            text: text.to_string(),
            start_seconds: start,
            end_seconds: end,
        }
    }

    async fn setup(policy: IndexPolicy) -> (Indexer, Arc<KnowledgeBase>) {
        let kb = Arc::new(
            KnowledgeBase::open(Arc::new(MemoryVectorIndex::new()), "video_rag")
                .await
                .unwrap(),
        );
        let embedder = Arc::new(LengthEmbedder {
            calls: AtomicUsize::new(0),
        });
        (Indexer::new(embedder, kb.clone(), policy), kb)
    }

    #[tokio::test]
    async fn test_index_assigns_deterministic_ids() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;
        let chunks = vec![chunk("a b ", 0.0, 35.0), chunk("c ", 35.0, 40.0)];

        let count = indexer.index("demo", &chunks).await.unwrap();
        assert_eq!(count, 2);

        let records = kb.records().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["demo_chunk_0", "demo_chunk_1"]);
        assert_eq!(records[1].metadata.start_seconds, 35.0);
        assert_eq!(records[1].metadata.end_seconds, 40.0);
        assert_eq!(records[1].text, "c ");
    }

    #[tokio::test]
    async fn test_replace_policy_keeps_latest_video_only() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;

        indexer.index("first", &[chunk("one", 0.0, 30.0)]).await.unwrap();
        indexer
            .index("second", &[chunk("two", 0.0, 30.0), chunk("three", 30.0, 60.0)])
            .await
            .unwrap();

        let videos = kb.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_label, "second");
        assert_eq!(kb.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_accumulate_policy_keeps_other_videos() {
        let (indexer, kb) = setup(IndexPolicy::Accumulate).await;

        indexer.index("first", &[chunk("one", 0.0, 30.0)]).await.unwrap();
        indexer.index("second", &[chunk("two", 0.0, 30.0)]).await.unwrap();
        indexer.index("first", &[chunk("uno", 0.0, 30.0)]).await.unwrap();

        assert_eq!(kb.list_videos().await.unwrap().len(), 2);
        assert_eq!(kb.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_index_same_input_twice_is_idempotent() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;
        let chunks = vec![chunk("a", 0.0, 30.0), chunk("b", 30.0, 45.0)];

        indexer.index("demo", &chunks).await.unwrap();
        let first = kb.records().await.unwrap();
        indexer.index("demo", &chunks).await.unwrap();
        let second = kb.records().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_chunks_clear_knowledge_base() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;
        indexer.index("demo", &[chunk("a", 0.0, 30.0)]).await.unwrap();

        let count = indexer.index("demo", &[]).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(kb.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_reports_progress_and_keeps_old_state() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;
        indexer.index("old", &[chunk("kept", 0.0, 30.0)]).await.unwrap();

        let chunks = vec![
            chunk("a", 0.0, 30.0),
            chunk("b", 30.0, 60.0),
            chunk("boom", 60.0, 90.0),
            chunk("d", 90.0, 120.0),
        ];
        let err = indexer.index("new", &chunks).await.unwrap_err();

        match err {
            VidragError::Indexing { embedded, .. } => assert_eq!(embedded, 2),
            other => panic!("unexpected error: {other}"),
        }

        let videos = kb.list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_label, "old");
    }

    #[tokio::test]
    async fn test_wrong_dimensions_fail_before_writing() {
        let (indexer, kb) = setup(IndexPolicy::Accumulate).await;

        let chunks = vec![chunk("a", 0.0, 30.0), chunk("wide", 30.0, 60.0)];
        let err = indexer.index("demo", &chunks).await.unwrap_err();

        match err {
            VidragError::Indexing { embedded, message } => {
                assert_eq!(embedded, 1);
                assert!(message.contains("expected 2 dimensions, got 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(kb.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_runs_on_spawned_task() {
        let (indexer, kb) = setup(IndexPolicy::Replace).await;
        let indexer = Arc::new(indexer);

        let task = tokio::spawn({
            let indexer = indexer.clone();
            async move {
                let chunks = vec![chunk("a", 0.0, 30.0), chunk("b", 30.0, 60.0)];
                indexer.index("spawned", &chunks).await
            }
        });

        assert_eq!(task.await.unwrap().unwrap(), 2);
        assert_eq!(kb.count().await.unwrap(), 2);
    }
}
