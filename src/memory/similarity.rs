//! Hybrid similarity + recency scoring.
//!
//! Distance converts to similarity as `1 / (1 + d)`, and recency applies
//! as a gentle multiplicative boost: `similarity * (1 + w * exp(-age/decay))`.
//! With the default 0.15 weight over a 90-day decay window, recency only
//! breaks near-ties — a highly relevant old memory still outranks a
//! barely relevant fresh one.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Weight of the recency component (0.1–0.2 works well).
pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.15;

/// Days for recency to decay to ~37% (1/e).
pub const DEFAULT_RECENCY_DECAY_DAYS: f64 = 90.0;

/// Convert a KNN distance to a similarity score in (0, 1], monotonically
/// decreasing in distance.
pub fn distance_to_similarity(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

/// Score a candidate by similarity with a recency boost.
///
/// Unparseable timestamps are treated as very old (twice the decay
/// window) rather than failing the search.
pub fn hybrid_score(
    distance: f64,
    created_at: &str,
    recency_weight: f64,
    recency_decay_days: f64,
) -> f64 {
    hybrid_score_at(Utc::now(), distance, created_at, recency_weight, recency_decay_days)
}

pub(crate) fn hybrid_score_at(
    now: DateTime<Utc>,
    distance: f64,
    created_at: &str,
    recency_weight: f64,
    recency_decay_days: f64,
) -> f64 {
    let similarity = distance_to_similarity(distance);

    let age_days = match parse_timestamp(created_at) {
        Some(then) => {
            let seconds = (now - then).num_milliseconds() as f64 / 1000.0;
            (seconds / 86_400.0).max(0.0)
        }
        None => recency_decay_days * 2.0,
    };

    let recency = (-age_days / recency_decay_days).exp();
    similarity * (1.0 + recency_weight * recency)
}

/// Parse an ISO 8601 timestamp; naive timestamps are assumed UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
