//! Entity CRUD — slug-addressed upserts, merge-patch updates, soft-delete.
//!
//! All mutating operations run their read-modify-write inside an
//! IMMEDIATE transaction, which takes SQLite's write lock up front so
//! concurrent writers on the same entity serialize. Every operation is
//! retried 3 times with 1-second spacing on transient connection
//! failures only; integrity violations and not-found surface
//! immediately.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::db::Db;
use crate::entity::merge::merge_patch;
use crate::entity::slug::make_entity_slug;
use crate::entity::types::{EntityCollection, UserEntity};
use crate::error::{from_sqlite, is_unique_violation, StoreError};
use crate::profile;
use crate::retry::with_fixed_retry;

/// Provenance marker written into `data.meta` by this service.
const META_SOURCE: &str = "llm_tool";

const ENTITY_COLUMNS: &str =
    "id, user_id, slug, collection, type, data, created_at, updated_at, archived_at";

/// Create a new entity, optionally merging into an existing row with the
/// same `(user_id, slug)`.
///
/// When `slug` is omitted it is auto-generated from the profile's owner
/// handle, the entity type, and a short suffix of the new entity ID.
/// With `allow_upsert`, a slug collision overwrites the existing row's
/// type/collection/data, refreshes `updated_at`, and clears
/// `archived_at` — an upsert can resurrect an archived entity. Without
/// it, a collision fails with [`StoreError::DuplicateSlug`].
pub async fn create_entity(
    db: &Db,
    user_id: &str,
    entity_type: &str,
    data: Value,
    slug: Option<String>,
    collection: EntityCollection,
    allow_upsert: bool,
) -> Result<UserEntity, StoreError> {
    with_fixed_retry("create_entity", || {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        let entity_type = entity_type.to_string();
        let data = data.clone();
        let slug = slug.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let conn = lock_db(&db)?;
                create_entity_sync(
                    &conn,
                    &user_id,
                    &entity_type,
                    data,
                    slug,
                    collection,
                    allow_upsert,
                )
            })
            .await
            .map_err(join_error)?
        }
    })
    .await
}

/// Point lookup by entity ID. `None` when missing — or archived, unless
/// `include_archived` is set.
pub async fn get_entity_by_id(
    db: &Db,
    user_id: &str,
    entity_id: &str,
    include_archived: bool,
) -> Result<Option<UserEntity>, StoreError> {
    get_by_key(db, user_id, "id", entity_id, include_archived).await
}

/// Point lookup by slug. Same archived-row semantics as
/// [`get_entity_by_id`].
pub async fn get_entity_by_slug(
    db: &Db,
    user_id: &str,
    slug: &str,
    include_archived: bool,
) -> Result<Option<UserEntity>, StoreError> {
    get_by_key(db, user_id, "slug", slug, include_archived).await
}

/// List a user's entities, most recently touched first.
pub async fn list_entities(
    db: &Db,
    user_id: &str,
    entity_type: Option<String>,
    collection: Option<EntityCollection>,
    include_archived: bool,
    limit: usize,
    offset: usize,
) -> Result<Vec<UserEntity>, StoreError> {
    with_fixed_retry("list_entities", || {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        let entity_type = entity_type.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let conn = lock_db(&db)?;
                list_entities_sync(
                    &conn,
                    &user_id,
                    entity_type.as_deref(),
                    collection,
                    include_archived,
                    limit,
                    offset,
                )
            })
            .await
            .map_err(join_error)?
        }
    })
    .await
}

/// Merge-patch the entity addressed by slug. Returns `None` when no
/// live row matches — callers must not assume update implies existence.
pub async fn update_entity_by_slug(
    db: &Db,
    user_id: &str,
    slug: &str,
    patch: Value,
) -> Result<Option<UserEntity>, StoreError> {
    update_by_key(db, user_id, "slug", slug, patch).await
}

/// Merge-patch the entity addressed by ID.
pub async fn update_entity_by_id(
    db: &Db,
    user_id: &str,
    entity_id: &str,
    patch: Value,
) -> Result<Option<UserEntity>, StoreError> {
    update_by_key(db, user_id, "id", entity_id, patch).await
}

/// Soft-delete an entity. Returns `false` when no live row matches, so
/// archiving twice is a quiet no-op the second time.
pub async fn archive_entity(
    db: &Db,
    user_id: &str,
    entity_id: &str,
    reason: Option<String>,
) -> Result<bool, StoreError> {
    with_fixed_retry("archive_entity", || {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        let entity_id = entity_id.to_string();
        let reason = reason.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let mut conn = lock_db(&db)?;
                archive_entity_sync(&mut conn, &user_id, &entity_id, reason.as_deref())
            })
            .await
            .map_err(join_error)?
        }
    })
    .await
}

// ── Sync internals ────────────────────────────────────────────────────────────

fn lock_db(db: &Db) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    db.lock()
        .map_err(|e| StoreError::Internal(format!("db lock poisoned: {e}")))
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Internal(format!("db task failed: {e}"))
}

fn create_entity_sync(
    conn: &Connection,
    user_id: &str,
    entity_type: &str,
    data: Value,
    slug: Option<String>,
    collection: EntityCollection,
    allow_upsert: bool,
) -> Result<UserEntity, StoreError> {
    let entity_id = uuid::Uuid::now_v7().to_string();

    let slug = match slug {
        Some(slug) => slug,
        None => {
            let profile = profile::get_user_profile(conn, user_id)
                .map_err(from_sqlite)?
                .ok_or_else(|| {
                    StoreError::Internal(format!(
                        "no profile for user {user_id}; cannot auto-generate slug"
                    ))
                })?;
            let short_id = entity_id.split('-').next().unwrap_or("");
            make_entity_slug(profile.owner_handle(), entity_type, short_id, None)
        }
    };

    let now = Utc::now().to_rfc3339();

    // Mirror the row id into the body and stamp provenance, so consumers
    // reading only the JSON blob can recover both without a join
    let mut body = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    body.insert("id".into(), Value::String(entity_id.clone()));
    let mut body = Value::Object(body);
    stamp_meta(&mut body, "created_source", META_SOURCE);
    stamp_meta(&mut body, "last_updated", &now);
    let data_json = serde_json::to_string(&body)?;

    let sql = if allow_upsert {
        format!(
            "INSERT INTO user_entities (id, user_id, slug, collection, type, data, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT(user_id, slug) DO UPDATE SET \
                 type = excluded.type, \
                 collection = excluded.collection, \
                 data = json_set(excluded.data, '$.id', user_entities.id), \
                 updated_at = excluded.updated_at, \
                 archived_at = NULL \
             RETURNING {ENTITY_COLUMNS}"
        )
    } else {
        format!(
            "INSERT INTO user_entities (id, user_id, slug, collection, type, data, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             RETURNING {ENTITY_COLUMNS}"
        )
    };

    let result = conn.query_row(
        &sql,
        params![
            entity_id,
            user_id,
            slug,
            collection.as_str(),
            entity_type,
            data_json,
            now
        ],
        row_to_entity,
    );

    match result {
        Ok(entity) => {
            tracing::debug!(id = %entity.id, slug = %entity.slug, "entity created");
            Ok(entity)
        }
        Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateSlug {
            user_id: user_id.to_string(),
            slug,
        }),
        Err(err) => Err(from_sqlite(err)),
    }
}

async fn get_by_key(
    db: &Db,
    user_id: &str,
    key_column: &'static str,
    key: &str,
    include_archived: bool,
) -> Result<Option<UserEntity>, StoreError> {
    with_fixed_retry("get_entity", || {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        let key = key.to_string();
        async move {
            tokio::task::spawn_blocking(move || {
                let conn = lock_db(&db)?;
                get_by_key_sync(&conn, &user_id, key_column, &key, include_archived)
            })
            .await
            .map_err(join_error)?
        }
    })
    .await
}

fn get_by_key_sync(
    conn: &Connection,
    user_id: &str,
    key_column: &str,
    key: &str,
    include_archived: bool,
) -> Result<Option<UserEntity>, StoreError> {
    let mut sql = format!(
        "SELECT {ENTITY_COLUMNS} FROM user_entities WHERE user_id = ?1 AND {key_column} = ?2"
    );
    if !include_archived {
        sql.push_str(" AND archived_at IS NULL");
    }

    conn.query_row(&sql, params![user_id, key], row_to_entity)
        .optional()
        .map_err(from_sqlite)
}

fn list_entities_sync(
    conn: &Connection,
    user_id: &str,
    entity_type: Option<&str>,
    collection: Option<EntityCollection>,
    include_archived: bool,
    limit: usize,
    offset: usize,
) -> Result<Vec<UserEntity>, StoreError> {
    let mut sql = format!("SELECT {ENTITY_COLUMNS} FROM user_entities WHERE user_id = ?");
    let mut args: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];

    if let Some(ref entity_type) = entity_type {
        sql.push_str(" AND type = ?");
        args.push(entity_type);
    }
    let collection_str = collection.map(|c| c.as_str());
    if let Some(ref collection_str) = collection_str {
        sql.push_str(" AND collection = ?");
        args.push(collection_str);
    }
    if !include_archived {
        sql.push_str(" AND archived_at IS NULL");
    }

    let limit = limit as i64;
    let offset = offset as i64;
    sql.push_str(" ORDER BY updated_at DESC LIMIT ? OFFSET ?");
    args.push(&limit);
    args.push(&offset);

    let mut stmt = conn.prepare(&sql).map_err(from_sqlite)?;
    let entities = stmt
        .query_map(args.as_slice(), row_to_entity)
        .map_err(from_sqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(from_sqlite)?;

    Ok(entities)
}

async fn update_by_key(
    db: &Db,
    user_id: &str,
    key_column: &'static str,
    key: &str,
    patch: Value,
) -> Result<Option<UserEntity>, StoreError> {
    with_fixed_retry("update_entity", || {
        let db = Arc::clone(db);
        let user_id = user_id.to_string();
        let key = key.to_string();
        let patch = patch.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let mut conn = lock_db(&db)?;
                update_by_key_sync(&mut conn, &user_id, key_column, &key, &patch)
            })
            .await
            .map_err(join_error)?
        }
    })
    .await
}

fn update_by_key_sync(
    conn: &mut Connection,
    user_id: &str,
    key_column: &str,
    key: &str,
    patch: &Value,
) -> Result<Option<UserEntity>, StoreError> {
    // IMMEDIATE takes the write lock before the read, so the
    // read-modify-write cannot interleave with another updater
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_sqlite)?;

    let existing = tx
        .query_row(
            &format!(
                "SELECT {ENTITY_COLUMNS} FROM user_entities \
                 WHERE user_id = ?1 AND {key_column} = ?2 AND archived_at IS NULL"
            ),
            params![user_id, key],
            row_to_entity,
        )
        .optional()
        .map_err(from_sqlite)?;

    let Some(mut entity) = existing else {
        return Ok(None);
    };

    let now = Utc::now().to_rfc3339();
    let mut merged = merge_patch(&entity.data, patch);
    stamp_meta(&mut merged, "last_updated", &now);
    let data_json = serde_json::to_string(&merged)?;

    tx.execute(
        "UPDATE user_entities SET data = ?1, updated_at = ?2 WHERE id = ?3",
        params![data_json, now, entity.id],
    )
    .map_err(from_sqlite)?;
    tx.commit().map_err(from_sqlite)?;

    entity.data = merged;
    entity.updated_at = now;
    Ok(Some(entity))
}

fn archive_entity_sync(
    conn: &mut Connection,
    user_id: &str,
    entity_id: &str,
    reason: Option<&str>,
) -> Result<bool, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_sqlite)?;

    let existing = tx
        .query_row(
            &format!(
                "SELECT {ENTITY_COLUMNS} FROM user_entities \
                 WHERE user_id = ?1 AND id = ?2 AND archived_at IS NULL"
            ),
            params![user_id, entity_id],
            row_to_entity,
        )
        .optional()
        .map_err(from_sqlite)?;

    let Some(mut entity) = existing else {
        return Ok(false);
    };

    let now = Utc::now().to_rfc3339();
    if let Some(reason) = reason {
        stamp_meta(&mut entity.data, "archive_reason", reason);
        stamp_meta(&mut entity.data, "archived_by", META_SOURCE);
    }
    let data_json = serde_json::to_string(&entity.data)?;

    tx.execute(
        "UPDATE user_entities SET data = ?1, archived_at = ?2, updated_at = ?2 WHERE id = ?3",
        params![data_json, now, entity.id],
    )
    .map_err(from_sqlite)?;
    tx.commit().map_err(from_sqlite)?;

    tracing::debug!(id = %entity_id, "entity archived");
    Ok(true)
}

/// Write `data.meta.<key> = value`, creating the `meta` object if needed.
fn stamp_meta(data: &mut Value, key: &str, value: &str) {
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }
    if let Some(map) = data.as_object_mut() {
        let meta = map
            .entry("meta")
            .or_insert_with(|| Value::Object(Map::new()));
        if !meta.is_object() {
            *meta = Value::Object(Map::new());
        }
        if let Some(meta) = meta.as_object_mut() {
            meta.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserEntity> {
    let collection_str: String = row.get(3)?;
    let data_str: String = row.get(5)?;
    Ok(UserEntity {
        id: row.get(0)?,
        user_id: row.get(1)?,
        slug: row.get(2)?,
        collection: collection_str.parse().unwrap_or_default(),
        entity_type: row.get(4)?,
        data: serde_json::from_str(&data_str).unwrap_or(Value::Null),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        archived_at: row.get(8)?,
    })
}
