//! Retry with exponential back-off and jitter for catalog API calls.
//!
//! Only transient failures are retried. Authentication and decode errors are
//! returned on the first attempt so a bad key never burns extra tokens.

use std::future::Future;
use std::time::Duration;

use crate::error::IngestError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: 429 responses, timeouts, connection failures, and 5xx.
pub(crate) fn is_retriable(err: &IngestError) -> bool {
    match err {
        IngestError::RateLimited { .. } => true,
        IngestError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        IngestError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// Sleeps `backoff_base_ms * 2^(attempt-1)` with ±25 % jitter, capped at 60 s.
/// A `Retry-After` hint from a 429 raises the delay to at least that many
/// seconds.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered =
                    (computed.min(MAX_DELAY_MS) as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let delay_ms = match &err {
                    IngestError::RateLimited { retry_after_secs } => {
                        jittered.max(retry_after_secs.saturating_mul(1_000).min(MAX_DELAY_MS))
                    }
                    _ => jittered,
                };
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "catalog API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
