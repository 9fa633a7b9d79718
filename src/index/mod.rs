//! Vector index abstraction and standardized record metadata.
//!
//! The index is a nearest-neighbor store keyed by the same IDs as the
//! relational rows. It is constructed explicitly and injected into the
//! insert and search paths — there is no process-wide singleton. The
//! bundled implementation is [`sqlite_vec::SqliteVecIndex`].

pub mod sqlite_vec;

use serde_json::{Map, Value};

use crate::error::StoreError;

/// JSON object type used for vector record metadata.
pub type Metadata = Map<String, Value>;

/// One record to upsert into the index.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    /// Raw source text, stored alongside the vector for retrieval.
    pub document: Option<String>,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub distance: f64,
    pub metadata: Metadata,
    pub document: Option<String>,
}

/// Flat equality filter applied server-side during a KNN query.
///
/// Only `user_id` is supported — compound or list-membership filtering
/// (type, tags) happens client-side after retrieval.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub user_id: Option<String>,
}

impl VectorFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

/// Collection-scoped nearest-neighbor store.
///
/// Implementations are synchronous under the hood; async callers offload
/// to a worker thread so the scheduler is never stalled.
pub trait VectorIndex: Send + Sync {
    /// Upsert a batch of records. Re-adding an existing ID replaces it.
    fn add_vectors(&self, records: &[VectorRecord]) -> Result<(), StoreError>;

    /// Replace existing records. Same semantics as [`Self::add_vectors`]
    /// for this implementation family; kept separate to mirror the index
    /// client interface.
    fn update_vectors(&self, records: &[VectorRecord]) -> Result<(), StoreError>;

    /// KNN query, nearest first.
    fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        filter: &VectorFilter,
    ) -> Result<Vec<VectorHit>, StoreError>;

    /// Delete records by ID. Unknown IDs are ignored.
    fn delete(&self, ids: &[String]) -> Result<(), StoreError>;
}

/// Build the standardized metadata object stored on every vector record:
/// the caller's `data` object spread first, then the reserved keys
/// (`user_id`, `memory_id`, `type`, comma-joined `tags`, `created_at`)
/// written over it — reserved keys always win on collision.
pub fn create_metadata(
    user_id: &str,
    memory_id: &str,
    memory_type: &str,
    tags: &[String],
    created_at: &str,
    data: Option<&Value>,
) -> Metadata {
    let mut metadata = match data {
        Some(Value::Object(map)) => map.clone(),
        _ => Metadata::new(),
    };

    metadata.insert("user_id".into(), Value::String(user_id.to_string()));
    metadata.insert("memory_id".into(), Value::String(memory_id.to_string()));
    metadata.insert("type".into(), Value::String(memory_type.to_string()));
    metadata.insert("tags".into(), Value::String(tags.join(",")));
    metadata.insert("created_at".into(), Value::String(created_at.to_string()));

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_contains_reserved_keys() {
        let meta = create_metadata(
            "u1",
            "m1",
            "WELLNESS",
            &["sleep".into(), "mood".into()],
            "2026-08-01T00:00:00Z",
            None,
        );
        assert_eq!(meta["user_id"], "u1");
        assert_eq!(meta["memory_id"], "m1");
        assert_eq!(meta["type"], "WELLNESS");
        assert_eq!(meta["tags"], "sleep,mood");
        assert_eq!(meta["created_at"], "2026-08-01T00:00:00Z");
    }

    #[test]
    fn caller_data_is_spread_but_reserved_keys_win() {
        let data = json!({
            "exercise": "bench_press",
            "type": "should-be-overwritten",
            "user_id": "spoofed",
        });
        let meta = create_metadata("u1", "m1", "WELLNESS", &[], "2026-08-01T00:00:00Z", Some(&data));

        assert_eq!(meta["exercise"], "bench_press");
        assert_eq!(meta["type"], "WELLNESS");
        assert_eq!(meta["user_id"], "u1");
    }

    #[test]
    fn empty_tags_join_to_empty_string() {
        let meta = create_metadata("u1", "m1", "PERSONAL", &[], "2026-08-01T00:00:00Z", None);
        assert_eq!(meta["tags"], "");
    }

    #[test]
    fn non_object_data_is_ignored() {
        let meta = create_metadata(
            "u1",
            "m1",
            "PERSONAL",
            &[],
            "2026-08-01T00:00:00Z",
            Some(&json!("not an object")),
        );
        assert_eq!(meta.len(), 5);
    }
}
