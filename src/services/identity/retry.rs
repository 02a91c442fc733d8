use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// One attempt of a unique-value insert.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The insert landed.
    Done(T),
    /// The candidate lost a uniqueness race; try a fresh one.
    Conflict,
    /// Another writer settled the row; stop retrying and re-read.
    Abort,
}

pub type AttemptFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<Attempt<T>, sqlx::Error>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("unique allocation still conflicting after {0} attempts")]
    Exhausted(usize),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Bounded retry around a generate-then-insert pair. The insert operation
/// must report uniqueness conflicts as [`Attempt::Conflict`] so expected
/// races stay distinguishable from real store failures, which abort the
/// loop immediately. `Ok(None)` means the loop was aborted by a concurrent
/// writer and the caller should re-read the settled row.
pub async fn with_unique_retry<'a, T, G, I>(
    max_attempts: usize,
    mut generate: G,
    mut insert: I,
) -> Result<Option<T>, RetryError>
where
    G: FnMut() -> String + Send,
    I: FnMut(String) -> AttemptFuture<'a, T> + Send,
{
    for _ in 0..max_attempts {
        match insert(generate()).await? {
            Attempt::Done(value) => return Ok(Some(value)),
            Attempt::Conflict => continue,
            Attempt::Abort => return Ok(None),
        }
    }
    Err(RetryError::Exhausted(max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_first_successful_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_insert = Arc::clone(&calls);

        let result = with_unique_retry(
            5,
            || "candidate".to_string(),
            move |candidate| {
                let calls = Arc::clone(&calls_in_insert);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Attempt::Done(candidate))
                })
            },
        )
        .await
        .unwrap();

        assert_eq!(result.as_deref(), Some("candidate"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in_insert = Arc::clone(&attempts);

        let result = with_unique_retry(
            5,
            || "x".to_string(),
            move |candidate| {
                let attempts = Arc::clone(&attempts_in_insert);
                Box::pin(async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Ok(Attempt::Conflict)
                    } else {
                        Ok(Attempt::Done(candidate))
                    }
                })
            },
        )
        .await
        .unwrap();

        assert!(result.is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_the_attempt_budget() {
        let err = with_unique_retry(
            3,
            || "x".to_string(),
            |_| Box::pin(async { Ok(Attempt::<String>::Conflict) }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::Exhausted(3)));
    }

    #[tokio::test]
    async fn abort_stops_retrying() {
        let result: Option<String> = with_unique_retry(
            5,
            || "x".to_string(),
            |_| Box::pin(async { Ok(Attempt::Abort) }),
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn store_errors_are_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in_insert = Arc::clone(&attempts);

        let err = with_unique_retry(
            5,
            || "x".to_string(),
            move |_| {
                let attempts = Arc::clone(&attempts_in_insert);
                Box::pin(async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<Attempt<String>, _>(sqlx::Error::Protocol("boom".into()))
                })
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::Store(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
