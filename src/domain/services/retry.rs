use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{error, warn};

use crate::error::AppError;

const INITIAL_BACKOFF_MS: u64 = 200;

/// Bounded retry of a whole operation on transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_total: Duration,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(15))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, max_total: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_total,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt/time budget is spent.
    ///
    /// Every attempt is cut off at the remaining budget and reported as `ProviderTimeout`.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let started = Instant::now();
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            attempt += 1;
            let remaining = self.max_total.saturating_sub(started.elapsed());

            let result = match timeout(remaining, op()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::ProviderTimeout(format!(
                    "{} exceeded its {}ms budget", op_name, self.max_total.as_millis()
                ))),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= self.max_attempts {
                error!("{} failed after {} attempts: {}", op_name, attempt, err);
                return Err(err);
            }
            if started.elapsed() + backoff >= self.max_total {
                error!("{} out of time budget after {} attempts: {}", op_name, attempt, err);
                return Err(err);
            }

            warn!("{} transient error ({}). Retrying in {}ms...", op_name, err, backoff.as_millis());
            sleep(backoff).await;
            backoff *= 2;
        }
    }
}
