//! 瞬态存储错误的有界重试
//!
//! 只重试 `RepositoryError::is_transient()` 的错误；唯一约束冲突和
//! 记录不存在是业务语义，重试只会重复得到同一个答案。

use std::future::Future;
use std::time::Duration;

use domain::RepositoryError;
use tokio::time::sleep;
use tracing::warn;

#[derive(Clone, Debug)]
pub enum Backoff {
    Exponential { base: Duration },
}

impl Backoff {
    pub fn exponential(base: Duration) -> Self {
        Backoff::Exponential { base }
    }

    fn delay_at(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Exponential { base } => {
                let exp = std::cmp::min(attempt.saturating_sub(1), 20);
                let factor = 1u32 << exp;
                base.saturating_mul(factor)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::exponential(Duration::from_millis(50)),
        }
    }
}

pub async fn retry_repository<F, Fut, T>(
    config: &RetryConfig,
    mut op: F,
) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !err.is_transient() {
                    return Err(err);
                }
                let delay = config.backoff.delay_at(attempt);
                warn!(attempt, ?delay, error = %err, "transient storage error, retrying");
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            backoff: Backoff::exponential(Duration::from_millis(1)),
        };

        let result: Result<(), _> = retry_repository(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RepositoryError::storage("connection reset")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_conflicts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();

        let result: Result<(), _> = retry_repository(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RepositoryError::Conflict) }
        })
        .await;

        assert_eq!(result, Err(RepositoryError::Conflict));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            backoff: Backoff::exponential(Duration::from_millis(1)),
        };

        let result = retry_repository(&config, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(RepositoryError::storage("timeout"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
