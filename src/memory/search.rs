//! User-scoped semantic search and time-aware ranked retrieval.
//!
//! Both entry points embed the query, ask the index for nearest
//! neighbors filtered server-side by `user_id` only, then apply the
//! type/tag filter client-side — the index's `where` support is flat
//! equality, nothing more. Results render to an LLM-ready context
//! string via [`SearchResponse::to_rag_context`].

use std::sync::Arc;

use serde_json::Value;

use crate::embedding::EmbeddingProvider;
use crate::error::StoreError;
use crate::index::{Metadata, VectorFilter, VectorHit, VectorIndex};
use crate::memory::similarity::{
    distance_to_similarity, hybrid_score, DEFAULT_RECENCY_DECAY_DAYS, DEFAULT_RECENCY_WEIGHT,
};

/// Substituted for blank queries so the embedding provider never sees
/// empty input.
pub const FALLBACK_QUERY: &str = "user information memories";

/// Query parameters echoed back on the response.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub type_filter: Option<String>,
}

/// A retrieved document with similarity scoring.
#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Higher is better; `1 / (1 + distance)` unless reranked.
    pub score: Option<f64>,
    pub distance: Option<f64>,
}

impl SearchDocument {
    fn from_hit(hit: VectorHit) -> Self {
        Self {
            id: hit.id,
            text: hit.document.unwrap_or_default(),
            metadata: hit.metadata,
            score: Some(distance_to_similarity(hit.distance)),
            distance: Some(hit.distance),
        }
    }
}

/// Response from [`search_memories`].
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub query: SearchQuery,
    pub documents: Vec<SearchDocument>,
    pub total_found: usize,
}

impl SearchResponse {
    /// Render results as a context string for retrieval-augmented
    /// generation. Entries are numbered and never cut mid-text: once the
    /// next entry would push past `max_length`, a `(N more results)`
    /// marker is appended instead.
    pub fn to_rag_context(&self, max_length: usize) -> String {
        if self.documents.is_empty() {
            return "No relevant information found.".to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        let mut current_length = 0usize;

        for (i, doc) in self.documents.iter().enumerate() {
            let score_info = match doc.score {
                Some(score) if score > 0.0 => format!(" (score: {score:.3})"),
                _ => String::new(),
            };
            let entry = format!("[{}] {}{}", i + 1, doc.text.trim(), score_info);

            if current_length + entry.len() > max_length && !parts.is_empty() {
                parts.push(format!("... ({} more results)", self.documents.len() - i));
                break;
            }

            current_length += entry.len() + 2; // +2 for the blank-line separator
            parts.push(entry);
        }

        parts.join("\n\n")
    }
}

/// Knobs for [`search_memories`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Keep a hit when its metadata `type` equals this, or the value
    /// appears among its tags.
    pub type_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            type_filter: None,
        }
    }
}

/// Knobs for [`search_memories_ranked`].
#[derive(Debug, Clone)]
pub struct RankedSearchOptions {
    pub top_k: usize,
    /// The reranker sees `top_k * candidate_multiplier` candidates so
    /// recency can reorder without starving the final result count.
    pub candidate_multiplier: usize,
    pub type_filter: Option<String>,
    pub recency_weight: f64,
    pub recency_decay_days: f64,
}

impl Default for RankedSearchOptions {
    fn default() -> Self {
        Self {
            top_k: 6,
            candidate_multiplier: 3,
            type_filter: None,
            recency_weight: DEFAULT_RECENCY_WEIGHT,
            recency_decay_days: DEFAULT_RECENCY_DECAY_DAYS,
        }
    }
}

/// Semantic search scoped to one user, similarity-ordered.
pub async fn search_memories(
    index: &Arc<dyn VectorIndex>,
    embedder: &Arc<dyn EmbeddingProvider>,
    user_id: &str,
    query: &str,
    opts: &SearchOptions,
) -> Result<SearchResponse, StoreError> {
    let query_text = effective_query(query);
    let embedding = embed_query(embedder, &query_text).await?;
    let hits = query_index(index, embedding, opts.top_k, user_id).await?;

    let documents: Vec<SearchDocument> = hits
        .into_iter()
        .filter(|hit| matches_type_filter(&hit.metadata, opts.type_filter.as_deref()))
        .map(SearchDocument::from_hit)
        .collect();

    Ok(SearchResponse {
        query: SearchQuery {
            text: query_text,
            top_k: opts.top_k,
            type_filter: opts.type_filter.clone(),
        },
        total_found: documents.len(),
        documents,
    })
}

/// Semantic search with a recency-aware rerank: over-fetch candidates,
/// score `similarity * (1 + weight * recency)`, and keep the top `top_k`.
/// Candidates without a `created_at` fall back to pure similarity.
pub async fn search_memories_ranked(
    index: &Arc<dyn VectorIndex>,
    embedder: &Arc<dyn EmbeddingProvider>,
    user_id: &str,
    query: &str,
    opts: &RankedSearchOptions,
) -> Result<Vec<SearchDocument>, StoreError> {
    let query_text = effective_query(query);
    let embedding = embed_query(embedder, &query_text).await?;

    let n_candidates = opts.top_k * opts.candidate_multiplier;
    let hits = query_index(index, embedding, n_candidates, user_id).await?;
    if hits.is_empty() {
        return Ok(vec![]);
    }

    let mut documents: Vec<SearchDocument> = Vec::new();
    for hit in hits {
        if !matches_type_filter(&hit.metadata, opts.type_filter.as_deref()) {
            continue;
        }
        let mut doc = SearchDocument::from_hit(hit);
        let created_at = doc
            .metadata
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let (Some(created_at), Some(distance)) = (created_at, doc.distance) {
            doc.score = Some(hybrid_score(
                distance,
                &created_at,
                opts.recency_weight,
                opts.recency_decay_days,
            ));
        }
        documents.push(doc);
    }

    // Stable sort: equal scores keep the index's distance ordering
    documents.sort_by(|a, b| {
        let score_a = a.score.unwrap_or(0.0);
        let score_b = b.score.unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    documents.truncate(opts.top_k);

    Ok(documents)
}

fn effective_query(query: &str) -> String {
    if query.trim().is_empty() {
        FALLBACK_QUERY.to_string()
    } else {
        query.to_string()
    }
}

async fn embed_query(
    embedder: &Arc<dyn EmbeddingProvider>,
    query: &str,
) -> Result<Vec<f32>, StoreError> {
    let embedder = Arc::clone(embedder);
    let query = query.to_string();
    tokio::task::spawn_blocking(move || embedder.embed_text(&query))
        .await
        .map_err(|e| StoreError::Internal(format!("embedding task failed: {e}")))?
}

async fn query_index(
    index: &Arc<dyn VectorIndex>,
    embedding: Vec<f32>,
    n_results: usize,
    user_id: &str,
) -> Result<Vec<VectorHit>, StoreError> {
    let index = Arc::clone(index);
    let filter = VectorFilter::for_user(user_id);
    tokio::task::spawn_blocking(move || index.query(&embedding, n_results, &filter))
        .await
        .map_err(|e| StoreError::Internal(format!("index task failed: {e}")))?
}

/// Keep a hit when no filter is set, its metadata `type` matches, or the
/// requested value appears in its comma- or list-normalized tags.
fn matches_type_filter(metadata: &Metadata, required: Option<&str>) -> bool {
    let Some(required) = required else {
        return true;
    };

    if metadata.get("type").and_then(Value::as_str) == Some(required) {
        return true;
    }

    match metadata.get("tags") {
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .any(|tag| !tag.is_empty() && tag == required),
        Some(Value::String(tags)) => tags
            .split(',')
            .map(str::trim)
            .any(|tag| !tag.is_empty() && tag == required),
        _ => false,
    }
}
