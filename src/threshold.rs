//! Post-run pass/fail gates over a [`Metrics`] value (§4.12).

use serde::Serialize;
use std::time::Duration;

use crate::metrics::Metrics;

/// Optional per-percentile duration ceilings plus a failure-rate ceiling.
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    /// Ceiling for the overall average duration; zero means not configured.
    pub avg: Duration,
    /// Ceiling for p50; zero means not configured.
    pub p50: Duration,
    /// Ceiling for p90; zero means not configured.
    pub p90: Duration,
    /// Ceiling for p95; zero means not configured.
    pub p95: Duration,
    /// Ceiling for p99; zero means not configured.
    pub p99: Duration,
    /// Maximum acceptable failure rate, in percent; `None` means not configured.
    pub max_failure_rate: Option<f64>,
}

/// One evaluated threshold row.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    /// Name of the check, e.g. `"http_req_duration.p95"` or `"http_req_failed.rate"`.
    pub name: String,
    /// Whether this individual check passed.
    pub passed: bool,
    /// The configured ceiling, formatted for display.
    pub threshold: String,
    /// The observed value, formatted for display.
    pub actual: String,
}

/// Overall pass/fail verdict plus the individual check results.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResults {
    /// True iff every configured check passed (vacuously true if none configured).
    pub passed: bool,
    /// Individual check results, in configuration order.
    pub results: Vec<ThresholdResult>,
}

/// Evaluates `thresholds` against `metrics`.
pub fn evaluate(thresholds: &Thresholds, metrics: &Metrics) -> ThresholdResults {
    let mut results = Vec::new();

    let mut duration_check = |name: &str, ceiling: Duration, actual: Duration| {
        if ceiling.is_zero() {
            return;
        }
        results.push(ThresholdResult {
            name: name.to_string(),
            passed: actual < ceiling,
            threshold: format!("{ceiling:?}"),
            actual: format!("{actual:?}"),
        });
    };

    duration_check("http_req_duration.avg", thresholds.avg, metrics.durations.avg);
    duration_check("http_req_duration.p50", thresholds.p50, metrics.durations.p50);
    duration_check("http_req_duration.p90", thresholds.p90, metrics.durations.p90);
    duration_check("http_req_duration.p95", thresholds.p95, metrics.durations.p95);
    duration_check("http_req_duration.p99", thresholds.p99, metrics.durations.p99);

    if let Some(ceiling_rate) = thresholds.max_failure_rate {
        let actual_rate = 100.0 - metrics.success_rate;
        results.push(ThresholdResult {
            name: "http_req_failed.rate".to_string(),
            passed: actual_rate < ceiling_rate,
            threshold: format!("{ceiling_rate}%"),
            actual: format!("{actual_rate:.2}%"),
        });
    }

    let passed = results.iter().all(|r| r.passed);
    ThresholdResults { passed, results }
}

/// Parses a percentage literal like `"1%"` into a ceiling fraction (`1.0`).
pub fn parse_percentage(s: &str) -> Result<f64, crate::error::ConfigError> {
    let trimmed = s.trim().strip_suffix('%').ok_or_else(|| {
        crate::error::ConfigError::Percentage(s.to_string())
    })?;
    trimmed.trim().parse::<f64>().map_err(|_| crate::error::ConfigError::Percentage(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DurationStats;

    fn metrics_with(success_rate: f64, p95: Duration) -> Metrics {
        Metrics {
            durations: DurationStats { p95, ..Default::default() },
            success_rate,
            ..Default::default()
        }
    }

    #[test]
    fn zero_ceiling_is_skipped() {
        let thresholds = Thresholds::default();
        let metrics = metrics_with(100.0, Duration::from_millis(500));
        let evaluated = evaluate(&thresholds, &metrics);
        assert!(evaluated.results.is_empty());
        assert!(evaluated.passed);
    }

    #[test]
    fn failing_duration_ceiling_fails_overall() {
        let thresholds = Thresholds { p95: Duration::from_millis(100), ..Default::default() };
        let metrics = metrics_with(100.0, Duration::from_millis(500));
        let evaluated = evaluate(&thresholds, &metrics);
        assert!(!evaluated.passed);
        assert!(!evaluated.results[0].passed);
    }

    #[test]
    fn failure_rate_ceiling() {
        let thresholds = Thresholds { max_failure_rate: Some(1.0), ..Default::default() };
        let metrics = metrics_with(0.0, Duration::ZERO);
        let evaluated = evaluate(&thresholds, &metrics);
        assert!(!evaluated.passed);
        assert_eq!(evaluated.results[0].name, "http_req_failed.rate");
    }

    #[test]
    fn parses_percentage_literal() {
        assert_eq!(parse_percentage("1%").unwrap(), 1.0);
        assert_eq!(parse_percentage(" 0.5% ").unwrap(), 0.5);
        assert!(parse_percentage("nope").is_err());
    }
}
