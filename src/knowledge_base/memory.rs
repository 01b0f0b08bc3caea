//! In-memory vector index.
//!
//! Useful for testing and for throwaway sessions.

use super::{
    cosine_similarity, rank, IndexedVideo, KnowledgeBaseRecord, ScoredRecord, VectorIndex,
};
use crate::error::{Result, VidragError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct StoredRecord {
    record: KnowledgeBaseRecord,
    indexed_at: DateTime<Utc>,
}

type Collections = HashMap<String, HashMap<String, StoredRecord>>;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    collections: RwLock<Collections>,
    aliases: RwLock<HashMap<String, String>>,
}

impl MemoryVectorIndex {
    /// Create a new, empty in-memory index.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| VidragError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| VidragError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn create_if_absent(&self, collection: &str) -> Result<()> {
        self.write()?.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.write()?.remove(collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[KnowledgeBaseRecord]) -> Result<usize> {
        let mut collections = self.write()?;
        let store = collections.get_mut(collection).ok_or_else(|| {
            VidragError::KnowledgeBase(format!("Collection does not exist: {}", collection))
        })?;

        let now = Utc::now();
        for record in records {
            store.insert(
                record.id.clone(),
                StoredRecord {
                    record: record.clone(),
                    indexed_at: now,
                },
            );
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        video_label: Option<&str>,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self.read()?;
        let Some(store) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<ScoredRecord> = store
            .values()
            .filter(|s| video_label.map_or(true, |label| s.record.metadata.video_label == label))
            .map(|s| ScoredRecord {
                score: cosine_similarity(embedding, &s.record.embedding),
                record: s.record.clone(),
            })
            .collect();

        rank(&mut results, limit);
        Ok(results)
    }

    async fn delete_video(&self, collection: &str, video_label: &str) -> Result<usize> {
        let mut collections = self.write()?;
        let Some(store) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let initial_len = store.len();
        store.retain(|_, s| s.record.metadata.video_label != video_label);
        Ok(initial_len - store.len())
    }

    async fn records(&self, collection: &str) -> Result<Vec<KnowledgeBaseRecord>> {
        let collections = self.read()?;
        let mut records: Vec<KnowledgeBaseRecord> = collections
            .get(collection)
            .map(|store| store.values().map(|s| s.record.clone()).collect())
            .unwrap_or_default();

        records.sort_by(|a, b| {
            a.metadata
                .video_label
                .cmp(&b.metadata.video_label)
                .then_with(|| a.metadata.chunk_index.cmp(&b.metadata.chunk_index))
        });
        Ok(records)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map(|s| s.len()).unwrap_or(0))
    }

    async fn list_videos(&self, collection: &str) -> Result<Vec<IndexedVideo>> {
        let collections = self.read()?;
        let Some(store) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut video_map: HashMap<&str, IndexedVideo> = HashMap::new();
        for stored in store.values() {
            let meta = &stored.record.metadata;
            let entry = video_map
                .entry(meta.video_label.as_str())
                .or_insert_with(|| IndexedVideo {
                    video_label: meta.video_label.clone(),
                    chunk_count: 0,
                    duration_seconds: 0.0,
                    indexed_at: stored.indexed_at,
                });

            entry.chunk_count += 1;
            entry.duration_seconds = entry.duration_seconds.max(meta.end_seconds);
            if stored.indexed_at > entry.indexed_at {
                entry.indexed_at = stored.indexed_at;
            }
        }

        let mut videos: Vec<IndexedVideo> = video_map.into_values().collect();
        videos.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(videos)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
        let aliases = self
            .aliases
            .read()
            .map_err(|e| VidragError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))?;
        Ok(aliases.get(alias).cloned())
    }

    async fn set_alias(&self, alias: &str, collection: &str) -> Result<()> {
        let mut aliases = self
            .aliases
            .write()
            .map_err(|e| VidragError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))?;
        aliases.insert(alias.to_string(), collection.to_string());
        Ok(())
    }
}
