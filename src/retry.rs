//! Fixed-count, fixed-delay retry for transient storage failures.
//!
//! Connection drops to SQLite or the vector index get 3 attempts spaced
//! 1 second apart. Integrity violations, validation errors, and
//! not-found results are never retried.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

pub(crate) const RETRY_ATTEMPTS: u32 = 3;
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run `op` up to [`RETRY_ATTEMPTS`] times, sleeping [`RETRY_DELAY`]
/// between attempts, retrying only when the error is transient.
pub(crate) async fn with_fixed_retry<T, F, Fut>(name: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < RETRY_ATTEMPTS => {
                tracing::warn!(op = name, attempt, error = %err, "transient failure, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_fixed_retry("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Transient("connection dropped".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_fixed_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Transient("still down".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_fixed_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StoreError::DuplicateSlug {
                    user_id: "u1".into(),
                    slug: "dave/father".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
