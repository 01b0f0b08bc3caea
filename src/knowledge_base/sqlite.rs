//! SQLite-based vector index.
//!
//! Embeddings are stored as little-endian `f32` blobs and cosine similarity is
//! computed in Rust. Collections and aliases live in their own tables so the
//! active collection survives restarts.

use super::{
    cosine_similarity, rank, IndexedVideo, KnowledgeBaseRecord, RecordMetadata, ScoredRecord,
    VectorIndex,
};
use crate::error::{Result, VidragError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        video_label TEXT NOT NULL,
        text TEXT NOT NULL,
        start_seconds REAL NOT NULL,
        end_seconds REAL NOT NULL,
        chunk_index INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE INDEX IF NOT EXISTS idx_records_video ON records(collection, video_label);

    CREATE TABLE IF NOT EXISTS aliases (
        alias TEXT PRIMARY KEY,
        collection TEXT NOT NULL
    );
"#;

const SELECT_RECORD: &str = r#"
    SELECT id, video_label, text, start_seconds, end_seconds, chunk_index, embedding
    FROM records
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidragError::KnowledgeBase(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<KnowledgeBaseRecord> {
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let chunk_index: i64 = row.get(5)?;

        Ok(KnowledgeBaseRecord {
            id: row.get(0)?,
            text: row.get(2)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            metadata: RecordMetadata {
                video_label: row.get(1)?,
                start_seconds: row.get(3)?,
                end_seconds: row.get(4)?,
                chunk_index: chunk_index as usize,
            },
        })
    }

    fn collection_exists(conn: &Connection, collection: &str) -> Result<bool> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn create_if_absent(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
            params![collection, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn drop_collection(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM records WHERE collection = ?1", params![collection])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
        tx.commit()?;

        debug!("Dropped collection {} ({} records)", collection, deleted);
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, collection: &str, records: &[KnowledgeBaseRecord]) -> Result<usize> {
        let conn = self.lock()?;

        if !Self::collection_exists(&conn, collection)? {
            return Err(VidragError::KnowledgeBase(format!(
                "Collection does not exist: {}",
                collection
            )));
        }

        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO records
                (collection, id, video_label, text, start_seconds, end_seconds,
                 chunk_index, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    collection,
                    record.id,
                    record.metadata.video_label,
                    record.text,
                    record.metadata.start_seconds,
                    record.metadata.end_seconds,
                    record.metadata.chunk_index as i64,
                    Self::embedding_to_bytes(&record.embedding),
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Upserted {} records into {}", records.len(), collection);
        Ok(records.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        video_label: Option<&str>,
    ) -> Result<Vec<ScoredRecord>> {
        let conn = self.lock()?;

        let sql = format!(
            "{} WHERE collection = ?1 AND (?2 IS NULL OR video_label = ?2)",
            SELECT_RECORD
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![collection, video_label], Self::row_to_record)?;

        let mut results = Vec::new();
        for row in rows {
            let record = row?;
            results.push(ScoredRecord {
                score: cosine_similarity(embedding, &record.embedding),
                record,
            });
        }

        rank(&mut results, limit);
        debug!("Found {} matching records", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, collection: &str, video_label: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND video_label = ?2",
            params![collection, video_label],
        )?;

        info!("Deleted {} records for video {}", deleted, video_label);
        Ok(deleted)
    }

    async fn records(&self, collection: &str) -> Result<Vec<KnowledgeBaseRecord>> {
        let conn = self.lock()?;

        let sql = format!(
            "{} WHERE collection = ?1 ORDER BY video_label, chunk_index",
            SELECT_RECORD
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![collection], Self::row_to_record)?;

        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn list_videos(&self, collection: &str) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_label, COUNT(*) AS chunk_count,
                   MAX(end_seconds) AS duration, MAX(indexed_at) AS indexed_at
            FROM records
            WHERE collection = ?1
            GROUP BY video_label
            ORDER BY indexed_at DESC
            "#,
        )?;

        let videos = stmt.query_map(params![collection], |row| {
            let chunk_count: i64 = row.get(1)?;
            let indexed_at_str: String = row.get(3)?;
            Ok(IndexedVideo {
                video_label: row.get(0)?,
                chunk_count: chunk_count as usize,
                duration_seconds: row.get(2)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result = videos.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(result)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let collection = conn
            .query_row(
                "SELECT collection FROM aliases WHERE alias = ?1",
                params![alias],
                |row| row.get(0),
            )
            .optional()?;
        Ok(collection)
    }

    async fn set_alias(&self, alias: &str, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO aliases (alias, collection) VALUES (?1, ?2)",
            params![alias, collection],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{test_record, KnowledgeBase};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sqlite_vector_index() {
        let index = SqliteVectorIndex::in_memory().unwrap();
        index.create_if_absent("kb").await.unwrap();

        let record = test_record("video1", 0, vec![1.0, 0.0, 0.0]);
        index.upsert("kb", &[record.clone()]).await.unwrap();

        let videos = index.list_videos("kb").await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_label, "video1");

        let results = index.query("kb", &[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].record, record);

        let deleted = index.delete_video("kb", "video1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(index.list_videos("kb").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let index = SqliteVectorIndex::in_memory().unwrap();
        index.create_if_absent("a").await.unwrap();
        index.create_if_absent("b").await.unwrap();

        index.upsert("a", &[test_record("demo", 0, vec![1.0])]).await.unwrap();
        index.upsert("b", &[test_record("demo", 0, vec![1.0])]).await.unwrap();

        index.drop_collection("a").await.unwrap();

        assert_eq!(index.count("a").await.unwrap(), 0);
        assert_eq!(index.count("b").await.unwrap(), 1);
        assert!(index.upsert("a", &[test_record("demo", 1, vec![1.0])]).await.is_err());
    }

    #[tokio::test]
    async fn test_filtered_query() {
        let index = SqliteVectorIndex::in_memory().unwrap();
        index.create_if_absent("kb").await.unwrap();
        index
            .upsert(
                "kb",
                &[test_record("a", 0, vec![1.0, 0.0]), test_record("b", 0, vec![0.0, 1.0])],
            )
            .await
            .unwrap();

        let results = index.query("kb", &[1.0, 0.0], 5, Some("b")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "b_chunk_0");
    }

    #[tokio::test]
    async fn test_active_collection_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.db");

        let active = {
            let index = Arc::new(SqliteVectorIndex::new(&path).unwrap());
            let kb = KnowledgeBase::open(index, "video_rag").await.unwrap();
            kb.replace(&[test_record("demo", 0, vec![0.5, 0.5])]).await.unwrap();
            kb.active_collection().await
        };

        let index = Arc::new(SqliteVectorIndex::new(&path).unwrap());
        let kb = KnowledgeBase::open(index, "video_rag").await.unwrap();

        assert_eq!(kb.active_collection().await, active);
        let records = kb.records().await.unwrap();
        assert_eq!(records, vec![test_record("demo", 0, vec![0.5, 0.5])]);
    }
}
