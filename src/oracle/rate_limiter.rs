//! Outbound rate limiting for price requests
//!
//! The upstream feed throttles aggressively, so every request the adapter makes first
//! takes a token from an instance-owned bucket. Callers wait for the next token
//! instead of being rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket refilled at a fixed rate
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, tokens_per_second: f64, max_tokens: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * tokens_per_second).min(max_tokens);
        self.last_update = now;
    }

    fn try_consume(&mut self, tokens_per_second: f64, max_tokens: f64) -> bool {
        self.refill(tokens_per_second, max_tokens);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until one full token is available
    fn wait_time(&self, tokens_per_second: f64) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / tokens_per_second)
    }
}

/// Spaces outbound requests at least `min_interval` apart (burst of one)
#[derive(Clone)]
pub struct PriceRateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
    tokens_per_second: f64,
    max_tokens: f64,
}

impl PriceRateLimiter {
    /// A zero interval disables limiting
    pub fn new(min_interval: Duration) -> Self {
        let tokens_per_second = if min_interval.is_zero() {
            f64::INFINITY
        } else {
            1.0 / min_interval.as_secs_f64()
        };

        Self {
            bucket: Arc::new(Mutex::new(TokenBucket::new(1.0))),
            tokens_per_second,
            max_tokens: 1.0,
        }
    }

    /// Take a token if one is available right now
    pub async fn try_acquire(&self) -> bool {
        if self.tokens_per_second.is_infinite() {
            return true;
        }
        let mut bucket = self.bucket.lock().await;
        bucket.try_consume(self.tokens_per_second, self.max_tokens)
    }

    /// Wait until a token is available and take it
    pub async fn acquire(&self) {
        if self.tokens_per_second.is_infinite() {
            return;
        }

        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_consume(self.tokens_per_second, self.max_tokens) {
                    return;
                }
                bucket.wait_time(self.tokens_per_second)
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "Price request throttled");
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for PriceRateLimiter {
    fn default() -> Self {
        // One request every six seconds keeps us under the public API quota.
        Self::new(Duration::from_secs(6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_token_burst() {
        let limiter = PriceRateLimiter::new(Duration::from_secs(60));

        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = PriceRateLimiter::new(Duration::from_millis(100));

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_zero_interval_never_blocks() {
        let limiter = PriceRateLimiter::new(Duration::ZERO);
        for _ in 0..100 {
            assert!(limiter.try_acquire().await);
        }
    }
}
