//! Background memory writes, supervised.
//!
//! The conversation layer hands extracted memories to [`ExtractionSupervisor`]
//! and moves on — the user-facing turn never blocks on persistence.
//! Batches flow through a bounded queue into a single worker that calls
//! the dual-write coordinator; when the queue is full, new batches are
//! dropped with a warning (delivery is at-most-best-effort by design).
//! Shutdown closes the queue and joins the worker, so in-flight writes
//! complete even when the session that produced them is already gone.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::memory::insert::insert_memories;
use crate::memory::types::MemoryCreate;

/// Default queue capacity (batches, not individual memories).
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Supervised background writer for extracted memories.
pub struct ExtractionSupervisor {
    tx: mpsc::Sender<Vec<MemoryCreate>>,
    tracker: TaskTracker,
}

impl ExtractionSupervisor {
    /// Spawn the worker. The supervisor owns clones of the store handles;
    /// sessions come and go independently.
    pub fn spawn(
        db: Db,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        queue_capacity: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Vec<MemoryCreate>>(queue_capacity);
        let tracker = TaskTracker::new();

        tracker.spawn(async move {
            while let Some(batch) = rx.recv().await {
                let count = batch.len();
                match insert_memories(&db, &index, &embedder, batch).await {
                    Ok(inserted) => {
                        tracing::debug!(count = inserted.len(), "background batch stored");
                    }
                    Err(err) => {
                        // Never surfaces to the conversation — log and move on
                        tracing::warn!(count, error = %err, "background memory insert failed");
                    }
                }
            }
        });
        tracker.close();

        Self { tx, tracker }
    }

    /// Enqueue a batch without blocking. Returns `false` when the batch
    /// was dropped (queue full or supervisor shut down).
    pub fn submit(&self, batch: Vec<MemoryCreate>) -> bool {
        if batch.is_empty() {
            return true;
        }
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(batch)) => {
                tracing::warn!(count = batch.len(), "extraction queue full, dropping batch");
                false
            }
            Err(mpsc::error::TrySendError::Closed(batch)) => {
                tracing::warn!(count = batch.len(), "extraction queue closed, dropping batch");
                false
            }
        }
    }

    /// Stop accepting work and wait for queued batches to drain.
    pub async fn shutdown(self) {
        drop(self.tx);
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::index::sqlite_vec::SqliteVecIndex;
    use crate::memory::types::MemoryType;
    use rusqlite::params;

    const DIMS: usize = 8;

    struct FlatEmbedder;

    impl EmbeddingProvider for FlatEmbedder {
        fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
            Ok(texts.iter().map(|_| vec![1.0; DIMS]).collect())
        }

        fn dimensions(&self) -> usize {
            DIMS
        }
    }

    fn fixture() -> (Db, Arc<dyn VectorIndex>, Arc<dyn EmbeddingProvider>) {
        let db = crate::db::shared(crate::db::open_memory_database().unwrap());
        let index: Arc<dyn VectorIndex> =
            Arc::new(SqliteVecIndex::open_in_memory("memories", DIMS).unwrap());
        (db, index, Arc::new(FlatEmbedder))
    }

    #[tokio::test]
    async fn submitted_batches_are_persisted_by_shutdown() {
        let (db, index, embedder) = fixture();
        let supervisor =
            ExtractionSupervisor::spawn(db.clone(), index, embedder, DEFAULT_QUEUE_CAPACITY);

        assert!(supervisor.submit(vec![
            MemoryCreate::new("u1", MemoryType::Wellness, "User slept 8 hours"),
            MemoryCreate::new("u1", MemoryType::Personal, "User lives in Seattle"),
        ]));
        assert!(supervisor.submit(vec![MemoryCreate::new(
            "u1",
            MemoryType::Lifestyle,
            "User runs every morning",
        )]));

        supervisor.shutdown().await;

        let conn = db.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE user_id = ?1",
                params!["u1"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn empty_batches_are_accepted_without_queueing() {
        let (db, index, embedder) = fixture();
        let supervisor = ExtractionSupervisor::spawn(db, index, embedder, 1);
        assert!(supervisor.submit(vec![]));
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn worker_failures_do_not_kill_the_supervisor() {
        let (db, index, embedder) = fixture();
        // Poison the relational store so inserts fail
        {
            let conn = db.lock().unwrap();
            conn.execute_batch("DROP TABLE memories").unwrap();
        }

        let supervisor =
            ExtractionSupervisor::spawn(db.clone(), index, embedder, DEFAULT_QUEUE_CAPACITY);
        assert!(supervisor.submit(vec![MemoryCreate::new(
            "u1",
            MemoryType::Wellness,
            "doomed memory",
        )]));
        // Shutdown still drains cleanly; the failure was logged, not raised
        supervisor.shutdown().await;
    }
}
