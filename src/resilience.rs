use crate::error::{MeshError, MeshResult};
/// Resilience Module
///
/// Retry-with-backoff helper shared by the threshold key layer (per-participant
/// share delivery) and the auto-heal controller (per-manifest re-encode
/// attempts). Kept deliberately small: this is not a circuit breaker, just a
/// bounded-attempt backoff loop with an operation name for tracing.
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration for resilient operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fixed-delay retry matching spec's "retry up to three times with 100ms
    /// delay" share-distribution rule (no exponential growth).
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }
}

/// Retry a future operation with backoff.
pub async fn retry_async<F, Fut, T>(
    operation: F,
    config: RetryConfig,
    operation_name: &str,
) -> MeshResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = MeshResult<T>>,
{
    let mut delay = config.initial_delay;
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        debug!(
            "attempting {} (attempt {}/{})",
            operation_name, attempt, config.max_attempts
        );

        let start = Instant::now();
        match operation().await {
            Ok(result) => {
                debug!(
                    "{} succeeded on attempt {} after {:?}",
                    operation_name,
                    attempt,
                    start.elapsed()
                );
                return Ok(result);
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < config.max_attempts {
                    warn!(
                        "{} failed on attempt {}, retrying in {:?}: {}",
                        operation_name,
                        attempt,
                        delay,
                        last_error.as_ref().unwrap()
                    );
                    sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * config.backoff_multiplier) as u64,
                        ),
                        config.max_delay,
                    );
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| MeshError::Generic("retry failed with no error".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result = retry_async(
            move || {
                let attempts = attempts_clone.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(MeshError::Generic("not yet".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
            RetryConfig::fixed(5, Duration::from_millis(1)),
            "test_op",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let result: MeshResult<()> = retry_async(
            || async { Err(MeshError::PeerUnreachable(7)) },
            RetryConfig::fixed(3, Duration::from_millis(1)),
            "test_op",
        )
        .await;

        assert!(matches!(result, Err(MeshError::PeerUnreachable(7))));
    }
}
