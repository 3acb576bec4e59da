use crate::backend::DataError;
use app_state::RetryConstants;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded retries with exponential backoff: the wait before attempt `k` (k >= 2) is
/// `base_delay * 2^(k - 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    #[must_use]
    pub const fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Wait before the given 1-based attempt. The first attempt never waits.
    #[must_use]
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let shift = (attempt - 2).min(20);
        self.base_delay.saturating_mul(1_u32 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

impl From<&RetryConstants> for RetryPolicy {
    fn from(constants: &RetryConstants) -> Self {
        Self::new(constants.max_retries, constants.base_delay())
    }
}

/// Run `operation`, retrying transient failures according to `policy`.
///
/// Non-transient errors are returned after the attempt that produced them. When every attempt
/// fails transiently the result is [`DataError::RetriesExhausted`] carrying `label`, the number
/// of attempts made and the last error.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, DataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DataError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => {
                warn!(label, attempt, "Attempt failed: {error}");

                if !error.is_transient() {
                    return Err(error);
                }
                if attempt >= max_attempts {
                    return Err(DataError::RetriesExhausted {
                        label: label.to_string(),
                        attempts: attempt,
                        last: Box::new(error),
                    });
                }

                attempt += 1;
                sleep(policy.delay_before_attempt(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendErrorKind, BackendFailure};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn reset() -> DataError {
        DataError::TransientNetwork("connection reset by peer".to_string())
    }

    #[test]
    fn delays_double_from_the_second_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_before_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_before_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before_attempt(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before_attempt(4), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries_plus_one_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = with_retry("load vaults", RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(reset()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(DataError::RetriesExhausted {
                label,
                attempts,
                last,
            }) => {
                assert_eq!(label, "load vaults");
                assert_eq!(attempts, 3);
                assert!(last.is_transient());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // 1s before attempt 2, 2s before attempt 3
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_further_attempts() {
        let calls = AtomicU32::new(0);

        let result = with_retry("fetch profile", RetryPolicy::default(), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt == 1 {
                    Err(reset())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.expect("second attempt succeeds"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry("create vault", RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(DataError::Backend(BackendFailure::permission_denied(
                    "new row violates row-level security policy",
                )))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            result.expect_err("must fail").backend_kind(),
            Some(BackendErrorKind::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().with_max_retries(0);

        let result: Result<(), _> = with_retry("probe", policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(reset()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(DataError::RetriesExhausted { attempts: 1, .. })
        ));
    }
}
