mod helpers;

use helpers::{test_db, test_embedder, test_index};
use keepsake::entity::{create_entity, EntityCollection};
use keepsake::memory::{
    insert_memories, reset_user, search_memories, MemoryCreate, MemoryType, SearchOptions,
};
use serde_json::json;

#[tokio::test]
async fn reset_removes_rows_and_vectors_for_one_user_only() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();

    insert_memories(
        &db,
        &index,
        &embedder,
        vec![
            MemoryCreate::new("u1", MemoryType::Wellness, "User slept 8 hours"),
            MemoryCreate::new("u1", MemoryType::Personal, "User lives in Seattle"),
            MemoryCreate::new("u2", MemoryType::Personal, "Other user lives in Austin"),
        ],
    )
    .await
    .unwrap();
    create_entity(
        &db,
        "u1",
        "father",
        json!({"first_name": "John"}),
        Some("user/father".into()),
        EntityCollection::Social,
        false,
    )
    .await
    .unwrap();

    let summary = reset_user(&db, &index, "u1").await.unwrap();
    assert_eq!(summary.vectors_deleted, 2);
    assert_eq!(summary.memories_deleted, 2);
    assert_eq!(summary.entities_deleted, 1);

    // u1 finds nothing afterwards
    let response = search_memories(&index, &embedder, "u1", "Seattle", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.total_found, 0);

    // u2's data is untouched
    let response = search_memories(&index, &embedder, "u2", "Austin", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.total_found, 1);

    {
        let conn = db.lock().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
    }
}

#[tokio::test]
async fn resetting_an_unknown_user_is_a_noop() {
    let db = test_db();
    let index = test_index();

    let summary = reset_user(&db, &index, "nobody").await.unwrap();
    assert_eq!(summary.vectors_deleted, 0);
    assert_eq!(summary.memories_deleted, 0);
    assert_eq!(summary.entities_deleted, 0);
}
