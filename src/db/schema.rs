//! SQL DDL for the relational store.
//!
//! Defines the `user_profiles`, `user_entities`, `memories`, and
//! `schema_meta` tables. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization. Vector storage lives in its own database — see
//! [`crate::index::sqlite_vec`].

use rusqlite::Connection;

/// All schema DDL statements for the relational store.
const SCHEMA_SQL: &str = r#"
-- Read-only profile data; owner handle feeds slug generation
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    first_name TEXT,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    created_at TEXT NOT NULL
);

-- Structured, semi-permanent user facts addressed by slug
CREATE TABLE IF NOT EXISTS user_entities (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    slug TEXT NOT NULL,
    collection TEXT NOT NULL DEFAULT 'misc' CHECK(collection IN (
        'identity','social','professional','health','lifestyle',
        'pursuits','resources','milestones','misc')),
    type TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    archived_at TEXT,
    UNIQUE(user_id, slug)
);

CREATE INDEX IF NOT EXISTS idx_user_entities_user_type
    ON user_entities(user_id, type, archived_at);
CREATE INDEX IF NOT EXISTS idx_user_entities_user_collection
    ON user_entities(user_id, collection, archived_at);
CREATE INDEX IF NOT EXISTS idx_user_entities_user_updated
    ON user_entities(user_id, updated_at);

-- Episodic/semantic text fragments; embedding is NULL until computed
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK(type IN ('WELLNESS','LIFESTYLE','PERSONAL')),
    text TEXT NOT NULL,
    data TEXT NOT NULL DEFAULT '{}',
    tags TEXT NOT NULL DEFAULT '[]',
    embedding BLOB,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
CREATE INDEX IF NOT EXISTS idx_memories_user_type ON memories(user_id, type);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"user_profiles".to_string()));
        assert!(tables.contains(&"user_entities".to_string()));
        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn slug_uniqueness_is_per_user() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = "INSERT INTO user_entities \
             (id, user_id, slug, collection, type, data, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 'social', 'father', '{}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')";

        conn.execute(insert, ["e1", "u1", "dave/father"]).unwrap();
        // Same slug, different user — fine
        conn.execute(insert, ["e2", "u2", "dave/father"]).unwrap();
        // Same (user, slug) — rejected
        let err = conn.execute(insert, ["e3", "u1", "dave/father"]);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_collection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let err = conn.execute(
            "INSERT INTO user_entities \
             (id, user_id, slug, collection, type, data, created_at, updated_at) \
             VALUES ('e1', 'u1', 'dave/x', 'stuff', 'x', '{}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err());
    }
}
