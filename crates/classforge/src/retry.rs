//! Shared retry utilities for backend operations.
//!
//! Every provider wraps its HTTP exchanges in [`with_retry`], which retries
//! transient failures with exponential backoff and returns every other error
//! on the first attempt.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::backend::{BackendError, short_error_message};

/// Default total number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Per-backend retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_base,
            max_backoff,
            jitter: true,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> usize {
        self.max_attempts.saturating_sub(1) as usize
    }

    /// Build an exponential backoff strategy from this policy.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.backoff_base)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_retries());

        if self.jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute `operation`, retrying transient failures according to `policy`.
///
/// Only errors for which [`BackendError::is_retryable`] holds are retried;
/// validation, authentication, conflict and not-found errors return
/// immediately. `label` names the operation in debug logs.
///
/// # Example
///
/// ```ignore
/// use classforge::retry::{RetryPolicy, with_retry};
///
/// let project = with_retry(&policy, "GET /projects/42", || async {
///     client.get_project(42).await
/// })
/// .await?;
/// ```
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(policy.clone().into_backoff())
        .when(BackendError::is_retryable)
        .notify(|err, dur| {
            tracing::debug!(
                "Transient failure on {}, retrying in {:?} (attempt {} of {}): {}",
                label,
                dur,
                attempt.load(Ordering::SeqCst),
                policy.max_attempts,
                short_error_message(err)
            );
        })
        .await
}
