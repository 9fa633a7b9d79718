//! Dual-write coordinator: relational rows first, vectors second.
//!
//! [`insert_memories`] batch-embeds the texts, commits all rows in one
//! relational transaction, then upserts the vectors. The ordering is a
//! deliberate asymmetric consistency choice — the relational store is
//! authoritative, the index is a secondary search accelerator. If the
//! vector upsert fails after the commit, the rows stay durable but
//! unsearchable; there is no compensating rollback.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::error::{from_sqlite, StoreError};
use crate::index::sqlite_vec::embedding_to_bytes;
use crate::index::{create_metadata, VectorIndex, VectorRecord};
use crate::memory::types::{join_tags, Memory, MemoryCreate};
use crate::retry::with_fixed_retry;

/// Insert a batch of memories into the relational store and the vector
/// index. Empty input is a no-op — no embedding round trip is wasted.
///
/// The whole operation (embed + both writes) is retried up to 3 times
/// on transient relational or index errors.
pub async fn insert_memories(
    db: &Db,
    index: &Arc<dyn VectorIndex>,
    embedder: &Arc<dyn EmbeddingProvider>,
    memories: Vec<MemoryCreate>,
) -> Result<Vec<Memory>, StoreError> {
    if memories.is_empty() {
        return Ok(vec![]);
    }

    with_fixed_retry("insert_memories", || {
        let db = Arc::clone(db);
        let index = Arc::clone(index);
        let embedder = Arc::clone(embedder);
        let memories = memories.clone();
        async move { insert_once(db, index, embedder, memories).await }
    })
    .await
}

async fn insert_once(
    db: Db,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    memories: Vec<MemoryCreate>,
) -> Result<Vec<Memory>, StoreError> {
    // One batch embedding call, order-preserving
    let texts: Vec<String> = memories.iter().map(|m| m.text.clone()).collect();
    let embeddings = tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed_texts(&refs)
    })
    .await
    .map_err(|e| StoreError::Internal(format!("embedding task failed: {e}")))??;

    if embeddings.len() != memories.len() {
        return Err(StoreError::Embedding(format!(
            "provider returned {} vectors for {} texts",
            embeddings.len(),
            memories.len()
        )));
    }

    let rows: Vec<Memory> = memories
        .into_iter()
        .zip(embeddings)
        .map(|(create, embedding)| Memory {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: create.user_id,
            memory_type: create.memory_type,
            text: create.text,
            data: if create.data.is_object() {
                create.data
            } else {
                serde_json::Value::Object(serde_json::Map::new())
            },
            tags: create.tags,
            embedding: Some(embedding),
            deleted: create.deleted,
            created_at: create
                .created_at
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        })
        .collect();

    // Relational commit strictly before the vector upsert
    let db_rows = rows.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| StoreError::Internal(format!("db lock poisoned: {e}")))?;
        insert_rows(&mut conn, &db_rows)
    })
    .await
    .map_err(|e| StoreError::Internal(format!("db task failed: {e}")))??;

    let records: Vec<VectorRecord> = rows.iter().map(vector_record).collect();
    tokio::task::spawn_blocking(move || index.add_vectors(&records))
        .await
        .map_err(|e| StoreError::Internal(format!("index task failed: {e}")))??;

    tracing::debug!(count = rows.len(), "memories inserted");
    Ok(rows)
}

fn insert_rows(conn: &mut Connection, rows: &[Memory]) -> Result<(), StoreError> {
    let tx = conn.transaction().map_err(from_sqlite)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO memories (id, user_id, type, text, data, tags, embedding, deleted, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .map_err(from_sqlite)?;

        for row in rows {
            let data_json = serde_json::to_string(&row.data)?;
            let tags_json = serde_json::to_string(&row.tags)?;
            stmt.execute(params![
                row.id,
                row.user_id,
                row.memory_type.as_str(),
                row.text,
                data_json,
                tags_json,
                row.embedding.as_deref().map(embedding_to_bytes),
                row.deleted,
                row.created_at,
            ])
            .map_err(from_sqlite)?;
        }
    }
    tx.commit().map_err(from_sqlite)
}

/// Build the index record for a persisted row. The metadata spreads the
/// row's own `data`, then the reserved keys win over anything same-named.
fn vector_record(row: &Memory) -> VectorRecord {
    VectorRecord {
        id: row.id.clone(),
        embedding: row.embedding.clone().unwrap_or_default(),
        metadata: create_metadata(
            &row.user_id,
            &row.id,
            row.memory_type.as_str(),
            &join_tags(&row.tags),
            &row.created_at,
            Some(&row.data),
        ),
        document: Some(row.text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sqlite_vec::SqliteVecIndex;
    use crate::index::VectorFilter;
    use crate::memory::types::{MemoryTag, MemoryType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIMS: usize = 16;

    struct FakeEmbedder {
        calls: AtomicUsize,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for FakeEmbedder {
        fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| hash_embedding(t)).collect())
        }

        fn dimensions(&self) -> usize {
            DIMS
        }
    }

    fn hash_embedding(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for token in text.split_whitespace() {
            let bucket = token.bytes().map(usize::from).sum::<usize>() % DIMS;
            v[bucket] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn fixture() -> (Db, Arc<dyn VectorIndex>, Arc<FakeEmbedder>) {
        let db = crate::db::shared(crate::db::open_memory_database().unwrap());
        let index: Arc<dyn VectorIndex> =
            Arc::new(SqliteVecIndex::open_in_memory("memories", DIMS).unwrap());
        let embedder = Arc::new(FakeEmbedder::new());
        (db, index, embedder)
    }

    #[tokio::test]
    async fn empty_input_skips_the_embedding_call() {
        let (db, index, embedder) = fixture();
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let inserted = insert_memories(&db, &index, &provider, vec![]).await.unwrap();
        assert!(inserted.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_is_embedded_in_one_call() {
        let (db, index, embedder) = fixture();
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let batch = vec![
            MemoryCreate::new("u1", MemoryType::Wellness, "User slept 8 hours"),
            MemoryCreate::new("u1", MemoryType::Personal, "User works in Seattle"),
            MemoryCreate::new("u1", MemoryType::Lifestyle, "User runs every morning"),
        ];
        let inserted = insert_memories(&db, &index, &provider, batch).await.unwrap();

        assert_eq!(inserted.len(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rows_and_vectors_share_ids() {
        let (db, index, embedder) = fixture();
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let create = MemoryCreate::new("u1", MemoryType::Wellness, "User slept 8 hours")
            .with_data(json!({"hours": 8}))
            .with_tags(vec![MemoryTag::Sleep]);
        let inserted = insert_memories(&db, &index, &provider, vec![create])
            .await
            .unwrap();
        let row = &inserted[0];
        assert!(!row.id.is_empty());
        assert!(row.embedding.is_some());

        // Relational side
        {
            let conn = db.lock().unwrap();
            let (text, deleted): (String, bool) = conn
                .query_row(
                    "SELECT text, deleted FROM memories WHERE id = ?1",
                    params![row.id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .unwrap();
            assert_eq!(text, "User slept 8 hours");
            assert!(!deleted);
        }

        // Vector side: same id, metadata carries the reserved keys
        let hits = index
            .query(
                row.embedding.as_ref().unwrap(),
                5,
                &VectorFilter::for_user("u1"),
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, row.id);
        assert_eq!(hits[0].metadata["memory_id"], row.id);
        assert_eq!(hits[0].metadata["user_id"], "u1");
        assert_eq!(hits[0].metadata["type"], "WELLNESS");
        assert_eq!(hits[0].metadata["tags"], "sleep");
        assert_eq!(hits[0].metadata["created_at"], row.created_at);
        assert_eq!(hits[0].metadata["hours"], 8);
        assert_eq!(hits[0].document.as_deref(), Some("User slept 8 hours"));
    }

    #[tokio::test]
    async fn reserved_metadata_keys_win_over_data() {
        let (db, index, embedder) = fixture();
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let create = MemoryCreate::new("u1", MemoryType::Personal, "User prefers oat milk")
            .with_data(json!({"type": "spoofed", "user_id": "someone-else"}));
        let inserted = insert_memories(&db, &index, &provider, vec![create])
            .await
            .unwrap();

        let hits = index
            .query(
                inserted[0].embedding.as_ref().unwrap(),
                5,
                &VectorFilter::for_user("u1"),
            )
            .unwrap();
        assert_eq!(hits[0].metadata["type"], "PERSONAL");
        assert_eq!(hits[0].metadata["user_id"], "u1");
    }

    #[tokio::test]
    async fn explicit_created_at_is_preserved() {
        let (db, index, embedder) = fixture();
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();

        let mut create = MemoryCreate::new("u1", MemoryType::Wellness, "Old memory");
        create.created_at = Some("2025-01-01T00:00:00+00:00".into());
        let inserted = insert_memories(&db, &index, &provider, vec![create])
            .await
            .unwrap();
        assert_eq!(inserted[0].created_at, "2025-01-01T00:00:00+00:00");

        let hits = index
            .query(
                inserted[0].embedding.as_ref().unwrap(),
                5,
                &VectorFilter::for_user("u1"),
            )
            .unwrap();
        assert_eq!(hits[0].metadata["created_at"], "2025-01-01T00:00:00+00:00");
    }
}
