mod helpers;

use chrono::{Duration, Utc};
use helpers::{test_db, test_embedder, test_index};
use keepsake::memory::{
    insert_memories, search_memories, search_memories_ranked, MemoryCreate, MemoryTag, MemoryType,
    RankedSearchOptions, SearchOptions,
};

#[tokio::test]
async fn stored_memory_is_immediately_searchable() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();

    let create = MemoryCreate::new("u1", MemoryType::Wellness, "User slept 8 hours last night")
        .with_tags(vec![MemoryTag::Sleep]);
    let inserted = insert_memories(&db, &index, &embedder, vec![create])
        .await
        .unwrap();
    assert_eq!(inserted.len(), 1);
    assert!(!inserted[0].id.is_empty());

    let response = search_memories(
        &index,
        &embedder,
        "u1",
        "slept 8 hours",
        &SearchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(response.total_found, 1);
    assert_eq!(response.documents[0].id, inserted[0].id);
    assert!(response.documents[0].score.unwrap() > 0.0);

    let context = response.to_rag_context(2000);
    assert!(context.contains("User slept 8 hours last night"));
    assert!(context.starts_with("[1]"));
}

#[tokio::test]
async fn search_does_not_cross_user_boundaries() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();

    insert_memories(
        &db,
        &index,
        &embedder,
        vec![
            MemoryCreate::new("u1", MemoryType::Personal, "User works at Initech"),
            MemoryCreate::new("u2", MemoryType::Personal, "User works at Globex"),
        ],
    )
    .await
    .unwrap();

    let response = search_memories(&index, &embedder, "u2", "works", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.total_found, 1);
    assert!(response.documents[0].text.contains("Globex"));
}

#[tokio::test]
async fn ranked_search_puts_the_fresh_duplicate_first() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();
    let now = Utc::now();

    let mut old = MemoryCreate::new("u1", MemoryType::Wellness, "User went for a morning run");
    old.created_at = Some((now - Duration::days(100)).to_rfc3339());
    let mut fresh = MemoryCreate::new("u1", MemoryType::Wellness, "User went for a morning run");
    fresh.created_at = Some((now - Duration::days(1)).to_rfc3339());

    let inserted = insert_memories(&db, &index, &embedder, vec![old, fresh])
        .await
        .unwrap();
    let fresh_id = &inserted[1].id;

    let ranked = search_memories_ranked(
        &index,
        &embedder,
        "u1",
        "morning run",
        &RankedSearchOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(ranked.len(), 2);
    assert_eq!(&ranked[0].id, fresh_id);
}

#[tokio::test]
async fn type_filter_narrows_results_after_retrieval() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();

    insert_memories(
        &db,
        &index,
        &embedder,
        vec![
            MemoryCreate::new("u1", MemoryType::Wellness, "User tracked a headache today")
                .with_tags(vec![MemoryTag::Symptom]),
            MemoryCreate::new("u1", MemoryType::Personal, "User tracked a new podcast today"),
        ],
    )
    .await
    .unwrap();

    let opts = SearchOptions {
        top_k: 10,
        type_filter: Some("WELLNESS".into()),
    };
    let response = search_memories(&index, &embedder, "u1", "tracked today", &opts)
        .await
        .unwrap();

    assert_eq!(response.total_found, 1);
    assert!(response.documents[0].text.contains("headache"));

    // Filtering by tag reaches the same memory
    let opts = SearchOptions {
        top_k: 10,
        type_filter: Some("symptom".into()),
    };
    let response = search_memories(&index, &embedder, "u1", "tracked today", &opts)
        .await
        .unwrap();
    assert_eq!(response.total_found, 1);
}

#[tokio::test]
async fn relational_rows_carry_their_embeddings() {
    let db = test_db();
    let index = test_index();
    let embedder = test_embedder();

    let inserted = insert_memories(
        &db,
        &index,
        &embedder,
        vec![MemoryCreate::new(
            "u1",
            MemoryType::Lifestyle,
            "User meditates before breakfast",
        )],
    )
    .await
    .unwrap();

    let conn = db.lock().unwrap();
    let blob: Vec<u8> = conn
        .query_row(
            "SELECT embedding FROM memories WHERE id = ?1",
            rusqlite::params![inserted[0].id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(blob.len(), helpers::DIMS * std::mem::size_of::<f32>());
}
