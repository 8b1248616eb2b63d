use crate::medusa::MedusaError;
use crate::metrics;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub delay: Duration,
    pub base_backoff: Duration,
    pub max_retries: u32,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(250),
            base_backoff: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

impl Throttle {
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            base_backoff: Duration::ZERO,
            max_retries: 3,
        }
    }

    pub async fn pace(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    /// Runs `op` after the fixed delay. Only rate-limit responses are retried.
    pub async fn call<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, MedusaError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MedusaError>>,
    {
        self.pace().await;
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Err(MedusaError::RateLimited { retry_after_secs }) => {
                    if attempt >= self.max_retries {
                        metrics::retries_exhausted(op);
                        return Err(MedusaError::RateLimitExhausted {
                            attempts: attempt + 1,
                        });
                    }
                    metrics::rate_limited(op, attempt + 1);
                    let wait = self.backoff_for(attempt, retry_after_secs);
                    warn!(
                        target = "sync.throttle",
                        op,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "rate_limited_backoff"
                    );
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn backoff_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let exponential = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
        if exponential.is_zero() {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(0.75..1.25);
        let wait = exponential.mul_f64(jitter);
        match retry_after_secs.map(Duration::from_secs) {
            Some(hint) if hint > wait => hint,
            _ => wait,
        }
    }
}
