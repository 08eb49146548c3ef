//! Retry with exponential backoff and jitter for gateway calls

use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled per attempt (default: 1000)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay (default: 30000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound of the uniform random jitter added to each delay (default: 1000)
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `attempt` (0-based) failed, given a jitter sample.
    pub fn delay_with_jitter(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exponential.saturating_add(jitter_ms).min(self.max_delay_ms))
    }

    /// Delay to wait after `attempt` (0-based) failed, with random jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        self.delay_with_jitter(attempt, jitter)
    }
}

/// Run `operation` until it succeeds, fails permanently, or the retry budget
/// is spent. The last error is returned unchanged.
///
/// Attempts never overlap: each one is awaited before the next delay starts.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= config.max_retries || !e.is_retriable() {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = label,
                    attempt = attempt + 1,
                    max_attempts = config.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Gateway call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 5,
            max_delay_ms: 50,
            jitter_ms: 2,
        }
    }

    fn server_error() -> StorageError {
        StorageError::Gateway {
            status: 500,
            message: "boom".into(),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_with_jitter(0, 0), Duration::from_millis(1000));
        assert_eq!(config.delay_with_jitter(1, 0), Duration::from_millis(2000));
        assert_eq!(config.delay_with_jitter(2, 0), Duration::from_millis(4000));
        assert_eq!(config.delay_with_jitter(2, 500), Duration::from_millis(4500));
        assert_eq!(config.delay_with_jitter(5, 999), Duration::from_millis(30_000));
        assert_eq!(config.delay_with_jitter(63, 0), Duration::from_millis(30_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.delay_for_attempt(1);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = with_retry(&fast(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 5ms + 10ms before jitter
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            base_delay_ms: 10_000,
            ..fast()
        };
        let start = Instant::now();

        let result: Result<()> = with_retry(&config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::Gateway {
                    status: 403,
                    message: "forbidden".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Gateway { status: 403, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retry(&fast(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(StorageError::Gateway {
                    status: 503,
                    message: format!("attempt {}", n),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(StorageError::Gateway { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "attempt 3");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 0,
            ..fast()
        };

        let result: Result<()> = with_retry(&config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
