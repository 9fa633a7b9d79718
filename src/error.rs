//! Error taxonomy for the memory core.
//!
//! Three classes matter to callers: transient infrastructure failures
//! (retried by [`crate::retry`]), integrity violations like a duplicate
//! slug (surfaced immediately, never retried), and everything else.
//! "Not found" is represented as `Option::None` by the store functions,
//! never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection-level failure that a fixed-delay retry may clear.
    #[error("transient storage error: {0}")]
    Transient(String),

    /// A live row with the same `(user_id, slug)` already exists.
    #[error("entity slug '{slug}' already exists for user {user_id}")]
    DuplicateSlug { user_id: String, slug: String },

    /// Non-transient database failure.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    /// Whether a fixed-count retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Classify a rusqlite error: busy/locked/IO failures are transient,
/// everything else is a hard database error.
pub(crate) fn from_sqlite(err: rusqlite::Error) -> StoreError {
    use rusqlite::ErrorCode;

    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::CannotOpen => StoreError::Transient(err.to_string()),
            _ => StoreError::Database(err),
        },
        _ => StoreError::Database(err),
    }
}

/// True for UNIQUE constraint violations (duplicate slug detection).
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("simulated".into()),
        )
    }

    #[test]
    fn busy_is_transient() {
        let err = from_sqlite(sqlite_failure(rusqlite::ffi::SQLITE_BUSY));
        assert!(err.is_transient());
    }

    #[test]
    fn locked_is_transient() {
        let err = from_sqlite(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED));
        assert!(err.is_transient());
    }

    #[test]
    fn constraint_violation_is_not_transient() {
        let raw = sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT);
        assert!(is_unique_violation(&raw));
        let err = from_sqlite(raw);
        assert!(!err.is_transient());
    }

    #[test]
    fn query_returned_no_rows_is_hard_error() {
        let err = from_sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_transient());
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn duplicate_slug_message_names_slug() {
        let err = StoreError::DuplicateSlug {
            user_id: "u1".into(),
            slug: "dave/father".into(),
        };
        assert!(err.to_string().contains("dave/father"));
        assert!(!err.is_transient());
    }
}
