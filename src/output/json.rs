//! JSON output, following the field names in spec §6.
//!
//! Grounded in the teacher's `reporter/json.rs`: nested `#[derive(Serialize)]`
//! DTOs built from the internal aggregate rather than deriving `Serialize`
//! directly on it, plus `serde_json::to_writer_pretty`. Durations are
//! formatted human-readable (µs/ms/s/m) rather than serialized as raw
//! `Duration` structs, matching the spec's output contract.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::duration::{DurationExt, FormattedDuration};
use crate::error::ReporterError;
use crate::metrics::{Metrics, StepMetrics};
use crate::threshold::ThresholdResults;

use super::OutputFormatter;

/// Machine-readable report format.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn print(
        &self,
        w: &mut dyn Write,
        metrics: &Metrics,
        thresholds: Option<&ThresholdResults>,
    ) -> Result<(), ReporterError> {
        let report = Report {
            duration: format_duration(metrics.duration),
            total_requests: metrics.total_requests,
            success_count: metrics.success_count,
            failure_count: metrics.failure_count,
            success_rate: metrics.success_rate,
            requests_per_sec: metrics.requests_per_sec,
            durations: DurationsDto::from(&metrics.durations),
            steps: metrics.steps.iter().map(|(name, s)| (name.clone(), StepDto::from(s))).collect(),
            thresholds: thresholds.map(ThresholdsDto::from),
        };
        serde_json::to_writer_pretty(&mut *w, &report)?;
        writeln!(w)?;
        Ok(())
    }
}

fn format_duration(d: Duration) -> String {
    format!("{:.2}", FormattedDuration::from(d, d.appropriate_unit()))
}

#[derive(Serialize)]
struct Report {
    duration: String,
    #[serde(rename = "totalRequests")]
    total_requests: u64,
    #[serde(rename = "successCount")]
    success_count: u64,
    #[serde(rename = "failureCount")]
    failure_count: u64,
    #[serde(rename = "successRate")]
    success_rate: f64,
    #[serde(rename = "requestsPerSec")]
    requests_per_sec: f64,
    durations: DurationsDto,
    steps: BTreeMap<String, StepDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thresholds: Option<ThresholdsDto>,
}

#[derive(Serialize)]
struct DurationsDto {
    min: String,
    max: String,
    avg: String,
    p50: String,
    p90: String,
    p95: String,
    p99: String,
}

impl From<&crate::metrics::DurationStats> for DurationsDto {
    fn from(d: &crate::metrics::DurationStats) -> Self {
        Self {
            min: format_duration(d.min),
            max: format_duration(d.max),
            avg: format_duration(d.avg),
            p50: format_duration(d.p50),
            p90: format_duration(d.p90),
            p95: format_duration(d.p95),
            p99: format_duration(d.p99),
        }
    }
}

#[derive(Serialize)]
struct StepDto {
    count: u64,
    success: u64,
    failed: u64,
    #[serde(rename = "successRate")]
    success_rate: f64,
    durations: DurationsDto,
}

impl From<&StepMetrics> for StepDto {
    fn from(s: &StepMetrics) -> Self {
        Self {
            count: s.count,
            success: s.success,
            failed: s.failed,
            success_rate: s.success_rate,
            durations: DurationsDto::from(&s.durations),
        }
    }
}

#[derive(Serialize)]
struct ThresholdsDto {
    passed: bool,
    results: Vec<ThresholdResultDto>,
}

#[derive(Serialize)]
struct ThresholdResultDto {
    name: String,
    passed: bool,
    threshold: String,
    actual: String,
}

impl From<&ThresholdResults> for ThresholdsDto {
    fn from(t: &ThresholdResults) -> Self {
        Self {
            passed: t.passed,
            results: t
                .results
                .iter()
                .map(|r| ThresholdResultDto {
                    name: r.name.clone(),
                    passed: r.passed,
                    threshold: r.threshold.clone(),
                    actual: r.actual.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;

    #[test]
    fn report_serializes_with_named_fields() {
        let metrics = metrics::compute(&[], Duration::from_secs(1));
        let mut buf = Vec::new();
        JsonFormatter.print(&mut buf, &metrics, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"totalRequests\""));
        assert!(!text.contains("\"thresholds\""));
    }
}
