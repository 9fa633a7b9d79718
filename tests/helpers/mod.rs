#![allow(dead_code)]

use std::sync::Arc;

use keepsake::db::{self, Db};
use keepsake::embedding::EmbeddingProvider;
use keepsake::error::StoreError;
use keepsake::index::sqlite_vec::SqliteVecIndex;
use keepsake::index::VectorIndex;

/// Embedding width used across the integration suites.
pub const DIMS: usize = 32;

/// Open a fresh in-memory relational store with a seeded profile for `u1`.
pub fn test_db() -> Db {
    let conn = db::open_memory_database().unwrap();
    conn.execute(
        "INSERT INTO user_profiles (user_id, display_name, first_name, timezone, created_at) \
         VALUES ('u1', 'Dave Smith', 'Dave', 'America/Los_Angeles', '2026-01-01T00:00:00Z')",
        [],
    )
    .unwrap();
    db::shared(conn)
}

/// Open a fresh in-memory vector index sized for [`HashEmbedder`].
pub fn test_index() -> Arc<dyn VectorIndex> {
    Arc::new(SqliteVecIndex::open_in_memory("memories", DIMS).unwrap())
}

/// Deterministic token-bucket embedder: texts sharing words land close,
/// identical texts land identical. Good enough to drive KNN in tests
/// without model files.
pub struct HashEmbedder;

impl EmbeddingProvider for HashEmbedder {
    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|t| hash_embedding(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

pub fn test_embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbedder)
}

pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for token in text.to_lowercase().split_whitespace() {
        let bucket = token.bytes().map(usize::from).sum::<usize>() % DIMS;
        v[bucket] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
