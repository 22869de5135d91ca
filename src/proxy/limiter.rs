//! Token bucket rate limiter shared by every upstream request

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::error::FetchError;

/// A token bucket that refills at `rate` tokens per second up to `burst` tokens.
///
/// Waiters reserve a token up front, so they are served in arrival order.
/// A rate that is not a positive finite number disables limiting.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: u32,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        let burst = burst.max(1);
        Self {
            rate,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last: Instant::now(),
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    fn unlimited(&self) -> bool {
        !(self.rate.is_finite() && self.rate > 0.0)
    }

    /// Takes one token, returning how long the caller must wait before using it.
    fn reserve(&self) -> Duration {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(f64::from(self.burst));
        bucket.last = now;
        bucket.tokens -= 1.0;

        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            // A tiny rate can ask for a wait longer than Duration can hold.
            Duration::try_from_secs_f64(-bucket.tokens / self.rate).unwrap_or(Duration::MAX)
        }
    }

    /// Hands back a reserved token that will not be used.
    fn release(&self) {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.tokens = (bucket.tokens + 1.0).min(f64::from(self.burst));
    }

    /// Waits until a token is available or `cancel` is tripped.
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if self.unlimited() {
            return Ok(());
        }

        let wait = self.reserve();
        if wait.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = cancel.cancelled() => {
                self.release();
                Err(FetchError::Cancelled)
            }
        }
    }
}
