//! Token bucket limiter for outbound generation requests.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Smooths request bursts down to the configured requests-per-second.
///
/// Capacity equals the refill rate, so at most one second's worth of
/// requests can burst before callers start waiting.
pub struct TokenBucketRateLimiter {
    bucket: Mutex<Bucket>,
    rate_per_sec: f64,
}

impl TokenBucketRateLimiter {
    /// `rate_per_sec` must be positive; the loader validates this before a
    /// client is ever built.
    pub fn new(rate_per_sec: f64) -> Self {
        debug_assert!(rate_per_sec > 0.0);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: rate_per_sec,
                refilled_at: Instant::now(),
            }),
            rate_per_sec,
        }
    }

    /// Take one token, sleeping until the bucket refills far enough.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.rate_per_sec);
                bucket.refilled_at = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                (1.0 - bucket.tokens) / self.rate_per_sec
            };
            // Lock released before sleeping.
            sleep(Duration::from_secs_f64(wait.max(0.01))).await;
        }
    }

    #[cfg(test)]
    async fn available(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = bucket.refilled_at.elapsed().as_secs_f64();
        (bucket.tokens + elapsed * self.rate_per_sec).min(self.rate_per_sec)
    }
}
