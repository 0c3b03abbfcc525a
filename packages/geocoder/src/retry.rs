//! Bounded retry for rate-limited lookups.
//!
//! A lookup that hits HTTP 429 is retried exactly once after a fixed
//! backoff — an explicit loop bound rather than retry-by-recursion, so the
//! worst case per coordinate is two requests. Other errors pass through
//! untouched; the resolver degrades them to placeholder results.

use std::future::Future;
use std::time::Duration;

use crate::GeocodeError;

/// Runs `op`, retrying once after `backoff` if it reports
/// [`GeocodeError::RateLimited`].
///
/// The closure is called to build a fresh future per attempt.
///
/// # Errors
///
/// Returns the second attempt's error if the retry also fails, or the first
/// attempt's error for anything other than rate limiting.
pub async fn once_on_rate_limit<T, F, Fut>(backoff: Duration, op: F) -> Result<T, GeocodeError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, GeocodeError>>,
{
    match op().await {
        Err(GeocodeError::RateLimited) => {
            log::warn!("Rate limited (HTTP 429), retrying once in {backoff:?}");
            tokio::time::sleep(backoff).await;
            op().await
        }
        other => other,
    }
}
