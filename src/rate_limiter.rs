//! A token bucket rate limiter whose rate can be changed live.
//!
//! The teacher wraps `governor::RateLimiter`, whose `Quota` is fixed at
//! construction. This spec needs the coordinator to retune the rate once per
//! phase tick without rebuilding the limiter, so this is a small hand-rolled
//! bucket instead, built on the same `parking_lot::Mutex` + `Arc` shape the
//! teacher uses for its [`crate::clock::Clock`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Returned by [`RateLimiter::wait`] when the wait was aborted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

struct Bucket {
    /// Tokens currently available.
    tokens: f64,
    /// Tokens added per second; also the burst capacity (§4.2).
    rate: f64,
    /// Wall time of the last refill computation.
    last_refill: tokio::time::Instant,
}

impl Bucket {
    fn refill(&mut self, now: tokio::time::Instant) {
        if self.rate <= 0.0 {
            self.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.rate);
        self.last_refill = now;
    }
}

/// Shared, live-mutable token bucket rate limiter.
///
/// Cheaply cloned; all clones share the same underlying bucket.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Bucket>>,
    notify: Arc<Notify>,
}

impl RateLimiter {
    /// Builds a limiter with the given initial rate (tokens/sec); burst
    /// capacity equals the rate. A rate of 0 means unlimited.
    pub fn new(rate: u64) -> Self {
        let rate = rate as f64;
        let now = tokio::time::Instant::now();
        Self {
            inner: Arc::new(Mutex::new(Bucket { tokens: rate, rate, last_refill: now })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Blocks until a token is available, or returns [`Cancelled`] if `cancel`
    /// fires first. A rate of 0 returns immediately: no limiting.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        loop {
            let wait_for = {
                let mut bucket = self.inner.lock();
                let now = tokio::time::Instant::now();
                bucket.refill(now);
                if bucket.rate <= 0.0 {
                    return Ok(());
                }
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }
                let deficit = 1.0 - bucket.tokens;
                Duration::from_secs_f64(deficit / bucket.rate)
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep(wait_for) => {}
                _ = self.notify.notified() => {}
            }
        }
    }

    /// Atomically changes both the refill rate and burst capacity to `r`.
    ///
    /// Existing waiters are woken so they can re-evaluate against the new
    /// rate rather than sleeping out a stale deficit.
    pub fn set_rate(&self, r: u64) {
        let r = r as f64;
        {
            let mut bucket = self.inner.lock();
            let now = tokio::time::Instant::now();
            bucket.refill(now);
            bucket.rate = r;
            bucket.tokens = bucket.tokens.min(r);
        }
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_rate_never_blocks() {
        let limiter = RateLimiter::new(0);
        let cancel = CancellationToken::new();
        for _ in 0..100 {
            limiter.wait(&cancel).await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn admits_at_most_rate_times_window_plus_burst() {
        let limiter = RateLimiter::new(30);
        let cancel = CancellationToken::new();
        let window = Duration::from_millis(300);
        let deadline = tokio::time::Instant::now() + window;

        let mut admitted = 0u64;
        loop {
            tokio::select! {
                res = limiter.wait(&cancel) => {
                    res.unwrap();
                    admitted += 1;
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }
        let bound = (30.0 * window.as_secs_f64() + 30.0) as u64;
        assert!(admitted <= bound, "admitted {admitted} exceeds bound {bound}");
    }

    #[tokio::test]
    async fn cancellation_aborts_wait() {
        let limiter = RateLimiter::new(1);
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();
        cancel.cancel();
        assert_eq!(limiter.wait(&cancel).await, Err(Cancelled));
    }

    #[tokio::test]
    async fn set_rate_takes_effect_for_new_waiters() {
        let limiter = RateLimiter::new(1);
        let cancel = CancellationToken::new();
        limiter.wait(&cancel).await.unwrap();
        limiter.set_rate(1000);
        limiter.wait(&cancel).await.unwrap();
    }
}
