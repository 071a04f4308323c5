use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Attempts made for a single HTTP call
pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Retry `operation` with exponential backoff while the error is retryable
pub async fn with_retry<F, Fut, T>(
    attempts: u32,
    initial_backoff: Duration,
    what: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    let mut backoff = initial_backoff;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < attempts && e.is_retryable() => {
                tracing::warn!(
                    attempt = attempt,
                    error = %e,
                    "{} failed, retrying in {:?}",
                    what,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Shorthand for the default three-try policy
pub async fn retry_default<F, Fut, T>(what: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(DEFAULT_ATTEMPTS, DEFAULT_INITIAL_BACKOFF, what, operation).await
}
