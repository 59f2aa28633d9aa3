//! Multi-producer event sink with a bounded, drop-on-full buffer (§4.9).
//!
//! Keeps the teacher's collector shape (a background task draining a
//! channel into aggregated state) but switches from the teacher's unbounded
//! channel to a bounded one with an explicit drop counter, and exposes
//! `events()`/`duration()` snapshot queries instead of folding straight into
//! a final report — the fold into [`crate::metrics::Metrics`] is a separate
//! pure function so it stays independently testable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::Event;
use crate::workflow::EventSink;

/// Default channel capacity, per the target range in §4.9.
pub const DEFAULT_CAPACITY: usize = 2048;

/// The write side: non-blocking, shared across every actor.
#[derive(Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventSink for Reporter {
    fn report(&self, event: Event) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Reporter {
    /// Number of events dropped so far because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Synthesizes and reports a `"panic"` event for an actor that panicked.
    pub(crate) fn report_panic(&self, actor_id: u64, payload: &str) {
        self.report(Event::panic(actor_id, payload));
    }
}

/// The single-consumer read side: owns the event buffer and the run's
/// start/end wall time.
pub struct Collector {
    events: Arc<Mutex<Vec<Event>>>,
    start: Instant,
    end: Mutex<Option<Instant>>,
    dropped: Arc<AtomicU64>,
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl Collector {
    /// Builds a `(Reporter, Collector)` pair backed by a bounded channel of
    /// `capacity` events.
    pub fn new(capacity: usize) -> (Reporter, Collector) {
        let (tx, mut rx) = mpsc::channel(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let events = Arc::new(Mutex::new(Vec::new()));

        let events_for_task = events.clone();
        let drain_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                events_for_task.lock().push(event);
            }
        });

        let reporter = Reporter { tx, dropped: dropped.clone() };
        let collector = Collector {
            events,
            start: Instant::now(),
            end: Mutex::new(None),
            dropped,
            drain_task: Mutex::new(Some(drain_task)),
        };
        (reporter, collector)
    }

    /// Records the end timestamp, stops acceptance, and blocks until the
    /// receiver has drained every event already sent.
    ///
    /// The caller must drop every [`Reporter`] clone before calling this (or
    /// concurrently with it) so the channel actually closes; otherwise the
    /// drain task runs forever and this never returns.
    pub async fn close(&self) {
        *self.end.lock() = Some(Instant::now());
        let task = self.drain_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// An immutable snapshot (a copy) of every event received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// `end - start` once closed, or `now - start` while still running.
    pub fn duration(&self) -> Duration {
        match *self.end.lock() {
            Some(end) => end.saturating_duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    /// Number of events dropped because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(step: &str) -> Event {
        Event {
            actor_id: 1,
            timestamp_ms: 0,
            step_name: step.to_string(),
            protocol: "http",
            duration: Duration::from_millis(1),
            success: true,
            error: String::new(),
            status_code: 200,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[tokio::test]
    async fn reported_events_are_drained_into_the_snapshot() {
        let (reporter, collector) = Collector::new(16);
        reporter.report(sample_event("a"));
        reporter.report(sample_event("b"));
        drop(reporter);
        collector.close().await;
        assert_eq!(collector.events().len(), 2);
    }

    #[tokio::test]
    async fn full_buffer_drops_and_counts() {
        let (reporter, collector) = Collector::new(1);
        // Fill the channel without giving the drain task a chance to run.
        for _ in 0..10 {
            reporter.report(sample_event("a"));
        }
        drop(reporter);
        collector.close().await;
        assert!(collector.dropped() > 0);
        assert_eq!(collector.events().len() as u64 + collector.dropped(), 10);
    }

    #[tokio::test]
    async fn duration_grows_before_close() {
        let (_reporter, collector) = Collector::new(16);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(collector.duration() >= Duration::from_millis(5));
    }
}
