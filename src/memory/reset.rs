//! Per-user purge of memories, entities, and their vectors.
//!
//! Vector IDs are removed first (only rows that actually have an
//! embedding can be in the index), then the relational rows. Used by the
//! `reset-user` CLI command.

use std::sync::Arc;

use rusqlite::params;

use crate::db::Db;
use crate::error::{from_sqlite, StoreError};
use crate::index::VectorIndex;

/// Counts of what a reset removed.
#[derive(Debug, Clone, Copy)]
pub struct ResetSummary {
    pub vectors_deleted: usize,
    pub memories_deleted: usize,
    pub entities_deleted: usize,
}

/// Delete every memory, entity, and vector belonging to `user_id`.
pub async fn reset_user(
    db: &Db,
    index: &Arc<dyn VectorIndex>,
    user_id: &str,
) -> Result<ResetSummary, StoreError> {
    // Collect the vector IDs before touching the rows
    let ids: Vec<String> = {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let conn = db
                .lock()
                .map_err(|e| StoreError::Internal(format!("db lock poisoned: {e}")))?;
            let mut stmt = conn
                .prepare("SELECT id FROM memories WHERE user_id = ?1 AND embedding IS NOT NULL")
                .map_err(from_sqlite)?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get::<_, String>(0))
                .map_err(from_sqlite)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(from_sqlite)?;
            Ok(ids)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("db task failed: {e}")))??
    };

    let vectors_deleted = ids.len();
    if !ids.is_empty() {
        let index = Arc::clone(index);
        tokio::task::spawn_blocking(move || index.delete(&ids))
            .await
            .map_err(|e| StoreError::Internal(format!("index task failed: {e}")))??;
    }

    let (memories_deleted, entities_deleted) = {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<(usize, usize), StoreError> {
            let mut conn = db
                .lock()
                .map_err(|e| StoreError::Internal(format!("db lock poisoned: {e}")))?;
            let tx = conn.transaction().map_err(from_sqlite)?;
            let memories = tx
                .execute("DELETE FROM memories WHERE user_id = ?1", params![user_id])
                .map_err(from_sqlite)?;
            let entities = tx
                .execute(
                    "DELETE FROM user_entities WHERE user_id = ?1",
                    params![user_id],
                )
                .map_err(from_sqlite)?;
            tx.commit().map_err(from_sqlite)?;
            Ok((memories, entities))
        })
        .await
        .map_err(|e| StoreError::Internal(format!("db task failed: {e}")))??
    };

    tracing::info!(
        user_id = %user_id,
        vectors_deleted,
        memories_deleted,
        entities_deleted,
        "user data reset"
    );

    Ok(ResetSummary {
        vectors_deleted,
        memories_deleted,
        entities_deleted,
    })
}
