//! CLI `reset-user` command — delete one user's data after confirmation.
//!
//! Removes the user's vectors from the index first, then their memory
//! and entity rows.

use anyhow::{bail, Result};
use std::io::Write;
use std::sync::Arc;

use crate::config::KeepsakeConfig;
use crate::index::sqlite_vec::SqliteVecIndex;
use crate::index::VectorIndex;

/// Delete all data for a user after confirmation.
pub async fn reset_user(config: &KeepsakeConfig, user_id: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let vector_path = config.resolved_vector_db_path();

    println!("WARNING: This will permanently delete ALL memories, entities, and vectors");
    println!("for user: {user_id}");
    println!("Database: {}", db_path.display());
    println!("Vector index: {}", vector_path.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let conn = crate::db::open_database(&db_path)?;
    let db = crate::db::shared(conn);

    // Dimensions only matter for KNN queries, not deletes — no need to
    // load the embedding model here
    let index: Arc<dyn VectorIndex> = Arc::new(SqliteVecIndex::open(
        &vector_path,
        &config.storage.collection,
        crate::embedding::DEFAULT_EMBEDDING_DIM,
    )?);

    let summary = crate::memory::reset_user(&db, &index, user_id).await?;

    println!(
        "Deleted {} vectors, {} memories, {} entities. Reset complete.",
        summary.vectors_deleted, summary.memories_deleted, summary.entities_deleted
    );
    Ok(())
}
