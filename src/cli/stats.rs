use anyhow::Result;
use rusqlite::params;

use crate::config::KeepsakeConfig;

/// Display store statistics in the terminal.
///
/// The memory/vector counts also make dual-write drift visible: rows
/// carrying an embedding should match the number of indexed vectors.
pub fn stats(config: &KeepsakeConfig, user_id: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let user_clause = |base: &str| match user_id {
        Some(_) => format!("{base} WHERE user_id = ?1"),
        None => base.to_string(),
    };
    let count = |sql: &str| -> Result<i64> {
        let count = match user_id {
            Some(user_id) => conn.query_row(sql, params![user_id], |row| row.get(0))?,
            None => conn.query_row(sql, [], |row| row.get(0))?,
        };
        Ok(count)
    };

    let total_memories = count(&user_clause("SELECT COUNT(*) FROM memories"))?;
    let embedded_memories = count(&match user_id {
        Some(_) => "SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL AND user_id = ?1"
            .to_string(),
        None => "SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL".to_string(),
    })?;
    let total_entities = count(&user_clause("SELECT COUNT(*) FROM user_entities"))?;
    let archived_entities = count(&match user_id {
        Some(_) => {
            "SELECT COUNT(*) FROM user_entities WHERE archived_at IS NOT NULL AND user_id = ?1"
                .to_string()
        }
        None => "SELECT COUNT(*) FROM user_entities WHERE archived_at IS NOT NULL".to_string(),
    })?;

    println!("Keepsake Statistics");
    println!("{}", "=".repeat(40));
    if let Some(user_id) = user_id {
        println!("  User:                {user_id}");
    }
    println!("  Total memories:      {total_memories}");
    println!("  With embeddings:     {embedded_memories}");
    println!();

    println!("Memories by type:");
    for memory_type in &["WELLNESS", "LIFESTYLE", "PERSONAL"] {
        let count: i64 = match user_id {
            Some(user_id) => conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE type = ?1 AND user_id = ?2",
                params![memory_type, user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE type = ?1",
                params![memory_type],
                |row| row.get(0),
            )?,
        };
        println!("  {memory_type:<12} {count}");
    }
    println!();

    println!("  Total entities:      {total_entities}");
    println!("  Archived:            {archived_entities}");
    println!();

    println!("Entities by collection:");
    let collections = [
        "identity",
        "social",
        "professional",
        "health",
        "lifestyle",
        "pursuits",
        "resources",
        "milestones",
        "misc",
    ];
    for collection in &collections {
        let count: i64 = match user_id {
            Some(user_id) => conn.query_row(
                "SELECT COUNT(*) FROM user_entities WHERE collection = ?1 AND user_id = ?2",
                params![collection, user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM user_entities WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?,
        };
        if count > 0 {
            println!("  {collection:<12} {count}");
        }
    }

    Ok(())
}
