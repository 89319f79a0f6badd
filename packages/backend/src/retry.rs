//! HTTP retry helpers for transient errors.
//!
//! Every backend request goes through [`send`] instead of calling
//! `reqwest::RequestBuilder::send()` directly. Idempotent requests get
//! automatic retry with exponential backoff on connection failures,
//! timeouts, HTTP 429 and HTTP 5xx. Inserts pass
//! [`Idempotency::NonIdempotent`] and are sent exactly once.
//!
//! ```ignore
//! let resp = retry::send(&policy, Idempotency::Idempotent, || client.get(&url)).await?;
//! ```

use std::time::Duration;

use crate::BackendError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry; doubles on every further retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Whether a request may safely be sent more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Reads, updates by id, deletes by id, auth calls.
    Idempotent,
    /// Inserts. A retried insert could create a duplicate row.
    NonIdempotent,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << shift)
    }

    const fn retries_for(&self, idempotency: Idempotency) -> u32 {
        match idempotency {
            Idempotency::Idempotent => self.max_retries,
            Idempotency::NonIdempotent => 0,
        }
    }
}

/// Sends the request built by `build_request`, retrying transient failures.
///
/// The closure is called on each attempt to construct a fresh
/// [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Returns the response of the last attempt whatever its status, so the
/// caller can read the backend's error message from a final 4xx/5xx.
///
/// # Errors
///
/// Returns [`BackendError::Http`] if no response was received after all
/// retries, or on a non-transient transport error.
#[allow(clippy::future_not_send)]
pub async fn send<F>(
    policy: &RetryPolicy,
    idempotency: Idempotency,
    build_request: F,
) -> Result<reqwest::Response, BackendError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.retries_for(idempotency);

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(BackendError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < max_retries {
                    log::warn!("  HTTP {status} from {}", response.url());
                    continue;
                }
                return Ok(response);
            }
        }
    }

    unreachable!("retry loop exited without returning")
}

/// HTTP 429 and 5xx are worth another attempt; other 4xx are permanent.
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
