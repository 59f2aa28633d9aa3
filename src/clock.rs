//! A pausable logical clock implementation.
//!
//! This module provides [`Clock`] for measuring elapsed time in benchmark
//! scenarios where the clock may need to be paused (e.g., during warmup).
//!
//! # Overview
//!
//! Unlike a simple `Instant`, the [`Clock`] can be paused and resumed, making it ideal
//! for benchmark frameworks where you want to exclude warmup time or other setup phases
//! from the measured duration.
//!
//! # Example
//!
//! ```ignore
//! use rlt_flow::clock::Clock;
//! use tokio::time::Duration;
//!
//! // Create a paused clock
//! let clock = Clock::new_paused();
//! assert_eq!(clock.elapsed(), Duration::ZERO);
//!
//! // Start the clock
//! clock.resume();
//! tokio::time::sleep(Duration::from_millis(10)).await;
//!
//! let elapsed = clock.elapsed();
//! assert!(elapsed >= Duration::from_millis(10));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// A logical clock that starts paused and can be resumed once.
///
/// This clock tracks elapsed time from the moment it is resumed, letting
/// callers exclude setup time (e.g. warmup) from the measured duration.
///
/// The clock is thread-safe and can be cloned to share between multiple tasks.
#[derive(Debug, Clone)]
pub struct Clock {
    inner: Arc<Mutex<InnerClock>>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InnerClock {
    status: Status,
    elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) enum Status {
    #[default]
    Paused,
    Running(Instant),
}

impl Clock {
    fn new(status: Status) -> Self {
        let inner = InnerClock { status, elapsed: Duration::default() };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Creates a new clock in paused state.
    /// Call `resume()` to start the clock.
    pub fn new_paused() -> Self {
        Self::new(Status::Paused)
    }

    /// Resumes the clock if it is currently paused.
    ///
    /// If the clock is already running, this method has no effect.
    /// Time will start accumulating from the moment this method is called.
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if let Status::Paused = inner.status {
            inner.status = Status::Running(Instant::now());
        }
    }

    /// Returns the total elapsed time, excluding paused periods.
    ///
    /// If the clock is running, this includes the time since the last resume.
    /// If the clock is paused, this returns the accumulated time up to the pause.
    pub fn elapsed(&self) -> Duration {
        let inner = self.inner.lock();
        match inner.status {
            Status::Paused => inner.elapsed,
            Status::Running(checkpoint) => inner.elapsed + checkpoint.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn paused_clock_reports_zero_elapsed() {
        let clock = Clock::new_paused();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_starts_elapsed_accumulating() {
        let clock = Clock::new_paused();
        clock.resume();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(clock.elapsed() >= Duration::from_millis(50));
    }
}
