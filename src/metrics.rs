//! Pure aggregate statistics over a captured event stream (§4.11).
//!
//! Deliberately independent of `hdrhistogram`'s interpolated quantiles: this
//! sorts the raw duration vector and applies the exact nearest-rank formula
//! so the testable ordering/purity invariants hold exactly rather than
//! approximately.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::event::Event;
use crate::util::rate;

/// min/max/avg plus the nearest-rank percentiles used throughout the report.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DurationStats {
    /// Smallest observed duration.
    pub min: Duration,
    /// Largest observed duration.
    pub max: Duration,
    /// Arithmetic mean.
    pub avg: Duration,
    /// 50th percentile (nearest-rank).
    pub p50: Duration,
    /// 90th percentile (nearest-rank).
    pub p90: Duration,
    /// 95th percentile (nearest-rank).
    pub p95: Duration,
    /// 99th percentile (nearest-rank).
    pub p99: Duration,
}

impl DurationStats {
    /// Computes stats over `sorted`, which must already be sorted ascending.
    fn from_sorted(sorted: &[Duration]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }
        let sum: Duration = sorted.iter().sum();
        let avg = sum / sorted.len() as u32;
        let percentile = |p: f64| -> Duration {
            let index = ((sorted.len() - 1) as f64 * p).floor() as usize;
            sorted[index]
        };
        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            avg,
            p50: percentile(0.50),
            p90: percentile(0.90),
            p95: percentile(0.95),
            p99: percentile(0.99),
        }
    }
}

/// Request counts plus duration stats for one step, or for the whole run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StepMetrics {
    /// Total attempts recorded for this step.
    pub count: u64,
    /// Attempts with `success == true`.
    pub success: u64,
    /// Attempts with `success == false`.
    pub failed: u64,
    /// `success / count * 100`, or 0 when `count == 0`.
    pub success_rate: f64,
    /// Duration statistics over every attempt of this step.
    pub durations: DurationStats,
}

/// Aggregate statistics for a captured run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Metrics {
    /// Wall-clock duration the run was observed over.
    pub duration: Duration,
    /// Total events recorded.
    pub total_requests: u64,
    /// Events with `success == true`.
    pub success_count: u64,
    /// Events with `success == false`.
    pub failure_count: u64,
    /// `success_count / total_requests * 100`, or 0 when empty.
    pub success_rate: f64,
    /// `total_requests / duration.as_secs_f64()`, or 0 when duration is zero.
    pub requests_per_sec: f64,
    /// Duration stats over every event regardless of step.
    pub durations: DurationStats,
    /// Duration stats broken down by step name.
    pub steps: BTreeMap<String, StepMetrics>,
}

/// Computes [`Metrics`] from an event snapshot and the run's wall-clock
/// duration. Pure: does not mutate `events`, and is deterministic for a
/// given input.
pub fn compute(events: &[Event], duration: Duration) -> Metrics {
    let total_requests = events.len() as u64;
    let success_count = events.iter().filter(|e| e.success).count() as u64;
    let failure_count = total_requests - success_count;
    let success_rate =
        if total_requests > 0 { success_count as f64 / total_requests as f64 * 100.0 } else { 0.0 };

    let mut all_durations: Vec<Duration> = events.iter().map(|e| e.duration).collect();
    all_durations.sort_unstable();

    let mut by_step: BTreeMap<String, Vec<(Duration, bool)>> = BTreeMap::new();
    for event in events {
        by_step.entry(event.step_name.clone()).or_default().push((event.duration, event.success));
    }
    let steps = by_step
        .into_iter()
        .map(|(name, mut attempts)| {
            attempts.sort_unstable_by_key(|(d, _)| *d);
            let durations: Vec<Duration> = attempts.iter().map(|(d, _)| *d).collect();
            let count = attempts.len() as u64;
            let success = attempts.iter().filter(|(_, s)| *s).count() as u64;
            let failed = count - success;
            let success_rate = if count > 0 { success as f64 / count as f64 * 100.0 } else { 0.0 };
            (
                name,
                StepMetrics {
                    count,
                    success,
                    failed,
                    success_rate,
                    durations: DurationStats::from_sorted(&durations),
                },
            )
        })
        .collect();

    Metrics {
        duration,
        total_requests,
        success_count,
        failure_count,
        success_rate,
        requests_per_sec: rate(total_requests, duration.as_secs_f64()),
        durations: DurationStats::from_sorted(&all_durations),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step: &str, ms: u64, success: bool) -> Event {
        Event {
            actor_id: 1,
            timestamp_ms: 0,
            step_name: step.to_string(),
            protocol: "http",
            duration: Duration::from_millis(ms),
            success,
            error: String::new(),
            status_code: if success { 200 } else { 500 },
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[test]
    fn empty_input_yields_zeros() {
        let metrics = compute(&[], Duration::from_secs(1));
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.durations, DurationStats::default());
    }

    #[test]
    fn percentile_ordering_holds() {
        let events: Vec<Event> =
            (1..=100).map(|i| event("s", i, true)).collect();
        let metrics = compute(&events, Duration::from_secs(1));
        let d = metrics.durations;
        assert!(d.min <= d.p50);
        assert!(d.p50 <= d.p90);
        assert!(d.p90 <= d.p95);
        assert!(d.p95 <= d.p99);
        assert!(d.p99 <= d.max);
        assert!(d.min <= d.avg);
        assert!(d.avg <= d.max);
    }

    #[test]
    fn compute_is_pure() {
        let events = vec![event("s", 10, true), event("s", 20, false)];
        let a = compute(&events, Duration::from_secs(1));
        let b = compute(&events, Duration::from_secs(1));
        assert_eq!(a, b);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn sums_distribute_over_partition() {
        let a = vec![event("s", 10, true), event("s", 20, true)];
        let b = vec![event("s", 30, false)];
        let mut combined = a.clone();
        combined.extend(b.clone());

        let whole = compute(&combined, Duration::from_secs(1));
        let part_a = compute(&a, Duration::from_secs(1));
        let part_b = compute(&b, Duration::from_secs(1));

        assert_eq!(whole.total_requests, part_a.total_requests + part_b.total_requests);
        assert_eq!(whole.success_count, part_a.success_count + part_b.success_count);
        assert_eq!(
            whole.steps["s"].count,
            part_a.steps["s"].count + part_b.steps.get("s").map(|s| s.count).unwrap_or(0)
        );
    }

    #[test]
    fn requests_per_sec_is_zero_for_zero_duration() {
        let events = vec![event("s", 10, true)];
        let metrics = compute(&events, Duration::ZERO);
        assert_eq!(metrics.requests_per_sec, 0.0);
    }
}
