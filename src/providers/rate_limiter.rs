//! Outbound request rate limiting
//!
//! Implements token bucket rate limiting so a burst of watchlist fetches
//! does not trip the provider's per-second quota. Callers wait for a token
//! instead of failing.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per period
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a new token bucket
    pub fn new(rate_per_second: u32) -> Self {
        let rate = rate_per_second.max(1);
        Self {
            capacity: rate,
            tokens: rate as f64,
            refill_rate: rate as f64,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let refill_amount = elapsed.as_secs_f64() * self.refill_rate;

        self.tokens = (self.tokens + refill_amount).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.refill_rate)
        }
    }
}

/// Shared limiter used by a provider client
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(rate_per_second: u32) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(rate_per_second)),
        }
    }

    /// Wait until a request slot is available
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_available()
            };

            tracing::debug!("Rate limit reached, waiting {:?}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_bucket_basic() {
        let mut bucket = TokenBucket::new(10);

        for _ in 0..10 {
            assert!(bucket.try_acquire());
        }

        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let mut bucket = TokenBucket::new(0);
        assert!(bucket.try_acquire());
        assert!(bucket.time_until_available() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Third request must wait roughly half a second for a refill
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(450));
    }
}
