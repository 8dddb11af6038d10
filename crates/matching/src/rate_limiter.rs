//! Per-queue token bucket rate limiter (spec.md §4.2 "Rate limiting").
//! `Poll` consults this before acquiring a task from the store.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

pub const DEFAULT_RATE_PER_SEC: f64 = 1000.0;
pub const DEFAULT_BURST: u32 = 100;

pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    tokens: Mutex<f64>,
    last_refill: Mutex<Instant>,
    rejections: AtomicI64,
}

impl TokenBucket {
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        Self {
            rate_per_sec,
            burst: burst as f64,
            tokens: Mutex::new(burst as f64),
            last_refill: Mutex::new(Instant::now()),
            rejections: AtomicI64::new(0),
        }
    }

    /// Attempts to take one token. Returns `true` if allowed.
    pub fn try_acquire(&self) -> bool {
        let mut tokens = self.tokens.lock();
        let mut last_refill = self.last_refill.lock();

        let now = Instant::now();
        let elapsed = now.duration_since(*last_refill).as_secs_f64();
        *tokens = (*tokens + elapsed * self.rate_per_sec).min(self.burst);
        *last_refill = now;

        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn rejections(&self) -> i64 {
        self.rejections.load(Ordering::Relaxed)
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_SEC, DEFAULT_BURST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_allows_immediate_bucket_drain() {
        let bucket = TokenBucket::new(10.0, 5);
        for _ in 0..5 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
        assert_eq!(bucket.rejections(), 1);
    }

    #[test]
    fn refills_over_time() {
        let bucket = TokenBucket::new(1000.0, 1);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(bucket.try_acquire());
    }
}
