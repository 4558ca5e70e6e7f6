//! Retry with exponential backoff for feed downloads.
//!
//! Transient failures (429, network errors, 5xx) are retried; anything else
//! is returned immediately so a broken feed URL fails fast.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::CatalogError;

/// Returns `true` if `err` is worth retrying after a backoff delay.
///
/// Retriable:
/// - [`CatalogError::RateLimited`]: HTTP 429.
/// - [`CatalogError::Http`]: network-level failure (connection reset, timeout).
/// - [`CatalogError::UnexpectedStatus`] with a 5xx status.
///
/// Everything else (4xx, bad payloads, store errors) is propagated at once.
pub(crate) fn is_retriable(err: &CatalogError) -> bool {
    match err {
        CatalogError::RateLimited { .. } | CatalogError::Http(_) => true,
        CatalogError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        CatalogError::Deserialize { .. }
        | CatalogError::Store { .. }
        | CatalogError::SnapshotMissing { .. }
        | CatalogError::InvalidKey { .. }
        | CatalogError::MissingFeedUrl => false,
    }
}

/// Longest pause between two feed attempts.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Executes `operation`, retrying transient errors up to `max_retries` extra
/// times.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds, jittered by ±25% and capped at [`MAX_DELAY`]. A 429 waits at
/// least as long as its `Retry-After`; when that exceeds the cap the error is
/// returned at once and the cache keeps serving what it has.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= max_retries {
            return Err(err);
        }
        attempt += 1;
        let Some(delay) = retry_delay(&err, attempt, backoff_base_secs) else {
            return Err(err);
        };

        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "feed fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Wait before retry `attempt`, or `None` when `err` should be returned as is.
fn retry_delay(err: &CatalogError, attempt: u32, backoff_base_secs: u64) -> Option<Duration> {
    if !is_retriable(err) {
        return None;
    }
    let backoff = jittered_backoff(attempt, backoff_base_secs);
    match err {
        CatalogError::RateLimited { retry_after_secs } => {
            let requested = Duration::from_secs(*retry_after_secs);
            (requested <= MAX_DELAY).then(|| backoff.max(requested))
        }
        _ => Some(backoff),
    }
}

fn jittered_backoff(attempt: u32, backoff_base_secs: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let nominal = Duration::from_secs(backoff_base_secs.saturating_mul(1 << exponent));
    nominal
        .min(MAX_DELAY)
        .mul_f64(rand::rng().random_range(0.75..=1.25))
        .min(MAX_DELAY)
}
