//! sqlite-vec backed vector index.
//!
//! Lives in its own SQLite database, separate from the relational store:
//! the dual-write coordinator commits rows first and upserts vectors
//! second, and the two must be able to fail independently. Each
//! collection is one `vec0` virtual table with `user_id` as a partition
//! key (the only server-side filterable column) plus auxiliary JSON
//! metadata and document columns.

use std::path::Path;
use std::sync::{Mutex, Once};

use rusqlite::{params, Connection};
use serde_json::Value;

use super::{Metadata, VectorFilter, VectorHit, VectorIndex, VectorRecord};
use crate::error::{from_sqlite, StoreError};

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Vector index over a single `vec0` collection table.
pub struct SqliteVecIndex {
    conn: Mutex<Connection>,
    table: String,
    dimensions: usize,
}

impl SqliteVecIndex {
    /// Open (or create) the index database at `path` with one collection table.
    pub fn open(
        path: impl AsRef<Path>,
        collection: &str,
        dimensions: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Internal(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        load_sqlite_vec();
        let conn = Connection::open(path).map_err(from_sqlite)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(from_sqlite)?;
        Self::init(conn, collection, dimensions)
    }

    /// Open an in-memory index (tests).
    pub fn open_in_memory(collection: &str, dimensions: usize) -> Result<Self, StoreError> {
        load_sqlite_vec();
        let conn = Connection::open_in_memory().map_err(from_sqlite)?;
        Self::init(conn, collection, dimensions)
    }

    fn init(conn: Connection, collection: &str, dimensions: usize) -> Result<Self, StoreError> {
        let table = table_name(collection)?;
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {table} USING vec0(
                id TEXT PRIMARY KEY,
                user_id TEXT PARTITION KEY,
                embedding FLOAT[{dimensions}],
                +metadata TEXT,
                +document TEXT
            );"
        ))
        .map_err(from_sqlite)?;

        tracing::debug!(table = %table, dimensions, "vector collection ready");

        Ok(Self {
            conn: Mutex::new(conn),
            table,
            dimensions,
        })
    }

    fn check_dimensions(&self, record: &VectorRecord) -> Result<(), StoreError> {
        if record.embedding.len() != self.dimensions {
            return Err(StoreError::Internal(format!(
                "embedding for {} has {} dimensions, index expects {}",
                record.id,
                record.embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            self.check_dimensions(record)?;
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("index lock poisoned: {e}")))?;
        let tx = conn.transaction().map_err(from_sqlite)?;

        {
            // vec0 has no ON CONFLICT — delete-then-insert is the upsert
            let mut delete = tx
                .prepare(&format!("DELETE FROM {} WHERE id = ?1", self.table))
                .map_err(from_sqlite)?;
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {} (id, user_id, embedding, metadata, document) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    self.table
                ))
                .map_err(from_sqlite)?;

            for record in records {
                let user_id = record
                    .metadata
                    .get("user_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let metadata_json = serde_json::to_string(&record.metadata)?;

                delete.execute(params![record.id]).map_err(from_sqlite)?;
                insert
                    .execute(params![
                        record.id,
                        user_id,
                        embedding_to_bytes(&record.embedding),
                        metadata_json,
                        record.document,
                    ])
                    .map_err(from_sqlite)?;
            }
        }

        tx.commit().map_err(from_sqlite)
    }
}

impl VectorIndex for SqliteVecIndex {
    fn add_vectors(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        self.upsert(records)
    }

    fn update_vectors(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        self.upsert(records)
    }

    fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>, StoreError> {
        if embedding.len() != self.dimensions {
            return Err(StoreError::Internal(format!(
                "query embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        if n_results == 0 {
            return Ok(vec![]);
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("index lock poisoned: {e}")))?;

        let mut sql = format!(
            "SELECT id, distance, metadata, document FROM {} \
             WHERE embedding MATCH ?1 AND k = ?2",
            self.table
        );
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?3");
        }
        sql.push_str(" ORDER BY distance");

        let mut stmt = conn.prepare(&sql).map_err(from_sqlite)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let metadata_str: Option<String> = row.get(2)?;
            Ok(VectorHit {
                id: row.get(0)?,
                distance: row.get(1)?,
                metadata: metadata_str
                    .and_then(|s| serde_json::from_str::<Metadata>(&s).ok())
                    .unwrap_or_default(),
                document: row.get(3)?,
            })
        };

        let emb_bytes = embedding_to_bytes(embedding);
        let hits = match &filter.user_id {
            Some(user_id) => stmt
                .query_map(params![emb_bytes, n_results as i64, user_id], map_row)
                .map_err(from_sqlite)?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(params![emb_bytes, n_results as i64], map_row)
                .map_err(from_sqlite)?
                .collect::<Result<Vec<_>, _>>(),
        }
        .map_err(from_sqlite)?;

        Ok(hits)
    }

    fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("index lock poisoned: {e}")))?;
        let tx = conn.transaction().map_err(from_sqlite)?;
        {
            let mut stmt = tx
                .prepare(&format!("DELETE FROM {} WHERE id = ?1", self.table))
                .map_err(from_sqlite)?;
            for id in ids {
                stmt.execute(params![id]).map_err(from_sqlite)?;
            }
        }
        tx.commit().map_err(from_sqlite)
    }
}

/// Validate and derive the vec0 table name for a collection.
fn table_name(collection: &str) -> Result<String, StoreError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::Internal(format!(
            "invalid collection name: {collection:?}"
        )));
    }
    Ok(format!("{collection}_vec"))
}
