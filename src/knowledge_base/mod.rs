//! Knowledge base storage.
//!
//! A [`VectorIndex`] provider stores records in named collections and ranks
//! them by cosine similarity. [`KnowledgeBase`] is the owned handle the
//! indexer and retriever share: it tracks which physical collection is
//! active and serializes writes against reads.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::config::KnowledgeBaseSettings;
use crate::error::{Result, VidragError};
use crate::segmenter::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Where a record's text sits in its video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Label the video was processed under.
    pub video_label: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Position of the chunk within its video.
    pub chunk_index: usize,
}

impl RecordMetadata {
    /// Start as `H:MM:SS`.
    pub fn start(&self) -> String {
        format_timestamp(self.start_seconds)
    }

    /// End as `H:MM:SS`.
    pub fn end(&self) -> String {
        format_timestamp(self.end_seconds)
    }

    /// Citation string, `[start - end]`.
    pub fn citation(&self) -> String {
        format!("[{} - {}]", self.start(), self.end())
    }
}

/// A chunk stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    /// Unique within a collection: `{video_label}_chunk_{index}`.
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl KnowledgeBaseRecord {
    /// Deterministic record id for a video's chunk.
    pub fn record_id(video_label: &str, chunk_index: usize) -> String {
        format!("{}_chunk_{}", video_label, chunk_index)
    }
}

/// A record with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: KnowledgeBaseRecord,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub video_label: String,
    pub chunk_count: usize,
    /// End of the last chunk, in seconds.
    pub duration_seconds: f64,
    pub indexed_at: DateTime<Utc>,
}

/// What processing a new video does to existing knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexPolicy {
    /// Only the most recently processed video is queryable.
    #[default]
    Replace,
    /// Videos accumulate; re-processing a label replaces only that label's records.
    Accumulate,
}

impl std::str::FromStr for IndexPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(IndexPolicy::Replace),
            "accumulate" => Ok(IndexPolicy::Accumulate),
            _ => Err(format!("Unknown index policy: {}", s)),
        }
    }
}

impl std::fmt::Display for IndexPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexPolicy::Replace => write!(f, "replace"),
            IndexPolicy::Accumulate => write!(f, "accumulate"),
        }
    }
}

/// Trait for vector index providers.
///
/// Querying a collection that does not exist returns no results.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create an empty collection unless it already exists.
    async fn create_if_absent(&self, collection: &str) -> Result<()>;

    /// Remove a collection and all of its records.
    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Remove every record from a collection, leaving it empty.
    async fn clear(&self, collection: &str) -> Result<()> {
        self.drop_collection(collection).await?;
        self.create_if_absent(collection).await
    }

    /// Insert or replace records by id.
    async fn upsert(&self, collection: &str, records: &[KnowledgeBaseRecord]) -> Result<usize>;

    /// Up to `limit` records ranked by descending similarity, optionally
    /// restricted to one video label.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        video_label: Option<&str>,
    ) -> Result<Vec<ScoredRecord>>;

    /// Delete a video's records.
    async fn delete_video(&self, collection: &str, video_label: &str) -> Result<usize>;

    /// All records, ordered by video label then chunk position.
    async fn records(&self, collection: &str) -> Result<Vec<KnowledgeBaseRecord>>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Per-video summaries, most recently indexed first.
    async fn list_videos(&self, collection: &str) -> Result<Vec<IndexedVideo>>;

    /// Physical collection an alias points to.
    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>>;

    /// Point an alias at a physical collection.
    async fn set_alias(&self, alias: &str, collection: &str) -> Result<()>;
}

/// Open the vector index provider named in the settings.
pub fn open_index(settings: &KnowledgeBaseSettings, sqlite_path: &Path) -> Result<Arc<dyn VectorIndex>> {
    match settings.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorIndex::new(sqlite_path)?)),
        "memory" => Ok(Arc::new(MemoryVectorIndex::new())),
        other => Err(VidragError::Config(format!(
            "Unknown knowledge base provider: {}",
            other
        ))),
    }
}

/// The deployment's knowledge base.
///
/// `name` is an alias resolved to the active physical collection. Reads hold
/// a shared lock on the active name and swapping in a new collection holds it
/// exclusively, so a query never observes a half-written or dropped
/// collection. Writers are serialized among themselves.
pub struct KnowledgeBase {
    index: Arc<dyn VectorIndex>,
    name: String,
    active: RwLock<String>,
    writer: Mutex<()>,
}

impl KnowledgeBase {
    /// Open the knowledge base `name`, creating its collection if needed.
    pub async fn open(index: Arc<dyn VectorIndex>, name: &str) -> Result<Self> {
        let active = index
            .resolve_alias(name)
            .await?
            .unwrap_or_else(|| name.to_string());
        index.create_if_absent(&active).await?;

        debug!("Knowledge base '{}' is backed by collection '{}'", name, active);

        Ok(Self {
            index,
            name: name.to_string(),
            active: RwLock::new(active),
            writer: Mutex::new(()),
        })
    }

    /// Physical collection currently answering queries.
    pub async fn active_collection(&self) -> String {
        self.active.read().await.clone()
    }

    /// Replace the whole knowledge base with `records`.
    ///
    /// Records are written to a fresh collection first. The alias flip and
    /// the drop of the previous collection happen under the write lock.
    #[instrument(skip(self, records), fields(kb = %self.name, count = records.len()))]
    pub async fn replace(&self, records: &[KnowledgeBaseRecord]) -> Result<usize> {
        let _writer = self.writer.lock().await;

        let staging = format!("{}__{}", self.name, Uuid::new_v4().simple());
        self.index.create_if_absent(&staging).await?;

        let written = match self.index.upsert(&staging, records).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(drop_err) = self.index.drop_collection(&staging).await {
                    warn!("Failed to drop staging collection {}: {}", staging, drop_err);
                }
                return Err(e);
            }
        };

        let mut active = self.active.write().await;
        if let Err(e) = self.index.set_alias(&self.name, &staging).await {
            if let Err(drop_err) = self.index.drop_collection(&staging).await {
                warn!("Failed to drop staging collection {}: {}", staging, drop_err);
            }
            return Err(e);
        }
        let previous = std::mem::replace(&mut *active, staging);

        if let Err(e) = self.index.drop_collection(&previous).await {
            warn!("Failed to drop previous collection {}: {}", previous, e);
        }
        drop(active);

        info!("Replaced knowledge base with {} records", written);
        Ok(written)
    }

    /// Add a video's records, replacing any earlier records under the same label.
    #[instrument(skip(self, records), fields(kb = %self.name, count = records.len()))]
    pub async fn extend(&self, video_label: &str, records: &[KnowledgeBaseRecord]) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let active = self.active.write().await;

        let removed = self.index.delete_video(&active, video_label).await?;
        if removed > 0 {
            debug!("Removed {} stale records for {}", removed, video_label);
        }

        let written = self.index.upsert(&active, records).await?;
        info!("Added {} records for {}", written, video_label);
        Ok(written)
    }

    /// Nearest records to `embedding`.
    pub async fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        video_label: Option<&str>,
    ) -> Result<Vec<ScoredRecord>> {
        let active = self.active.read().await;
        self.index.query(&active, embedding, limit, video_label).await
    }

    /// All records in the active collection.
    pub async fn records(&self) -> Result<Vec<KnowledgeBaseRecord>> {
        let active = self.active.read().await;
        self.index.records(&active).await
    }

    /// Number of records in the active collection.
    pub async fn count(&self) -> Result<usize> {
        let active = self.active.read().await;
        self.index.count(&active).await
    }

    /// Videos in the active collection.
    pub async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let active = self.active.read().await;
        self.index.list_videos(&active).await
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort by descending score, breaking ties by video then chunk position.
pub(crate) fn rank(results: &mut Vec<ScoredRecord>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.metadata.video_label.cmp(&b.record.metadata.video_label))
            .then_with(|| a.record.metadata.chunk_index.cmp(&b.record.metadata.chunk_index))
    });
    results.truncate(limit);
}

#[cfg(test)]
pub(crate) fn test_record(label: &str, index: usize, embedding: Vec<f32>) -> KnowledgeBaseRecord {
    KnowledgeBaseRecord {
        id: KnowledgeBaseRecord::record_id(label, index),
        text: format!("{} chunk {}", label, index),
        embedding,
        metadata: RecordMetadata {
            video_label: label.to_string(),
            start_seconds: index as f64 * 30.0,
            end_seconds: (index + 1) as f64 * 30.0,
            chunk_index: index,
        },
    }
}
