//! Human-readable text output with ✓/✗ threshold markers (§6).
//!
//! Grounded in the teacher's `reporter/text.rs`: `crossterm` styling plus
//! `tabled` tables for aligned columns. The teacher's baseline-comparison and
//! interpolated-histogram sections are dropped (nothing here persists
//! cross-run state, and `Metrics` doesn't carry raw per-attempt durations for
//! a bucket display); everything else follows the same section/coloring
//! conventions.

use std::io::Write;

use crossterm::style::{StyledContent, Stylize};
use tabled::builder::Builder;
use tabled::settings::object::{Columns, FirstRow};
use tabled::settings::{Alignment, Padding, Style};

use crate::duration::{DurationExt, FormattedDuration};
use crate::error::ReporterError;
use crate::metrics::{DurationStats, Metrics};
use crate::threshold::ThresholdResults;

use super::OutputFormatter;

/// Human-readable report format.
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn print(
        &self,
        w: &mut dyn Write,
        metrics: &Metrics,
        thresholds: Option<&ThresholdResults>,
    ) -> Result<(), ReporterError> {
        print_summary(w, metrics)?;

        if metrics.total_requests > 0 {
            writeln!(w)?;
            print_durations(w, "Latencies", &metrics.durations)?;

            if !metrics.steps.is_empty() {
                writeln!(w)?;
                print_steps(w, metrics)?;
            }
        }

        if let Some(thresholds) = thresholds {
            writeln!(w)?;
            print_thresholds(w, thresholds)?;
        }

        Ok(())
    }
}

fn h1(s: &str) -> StyledContent<&str> {
    s.bold().underlined().yellow()
}

fn render_success_rate(rate: f64) -> StyledContent<String> {
    let text = format!("{rate:.2}%");
    if rate >= 100.0 {
        text.green().bold()
    } else if rate >= 99.0 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}

fn print_summary(w: &mut dyn Write, metrics: &Metrics) -> Result<(), ReporterError> {
    writeln!(w, "{}", h1("Summary"))?;
    writeln!(
        w,
        "  {} requests in {}, {} success, {:.2}/s",
        metrics.total_requests,
        format!("{:.2}", FormattedDuration::from(metrics.duration, metrics.duration.appropriate_unit()))
            .cyan()
            .bold(),
        render_success_rate(metrics.success_rate),
        metrics.requests_per_sec,
    )?;
    Ok(())
}

fn print_durations(w: &mut dyn Write, title: &str, d: &DurationStats) -> Result<(), ReporterError> {
    writeln!(w, "{}", h1(title))?;
    let rows = vec![
        vec![
            "Min".to_string(),
            "Avg".to_string(),
            "P50".to_string(),
            "P90".to_string(),
            "P95".to_string(),
            "P99".to_string(),
            "Max".to_string(),
        ],
        vec![fmt(d.min), fmt(d.avg), fmt(d.p50), fmt(d.p90), fmt(d.p95), fmt(d.p99), fmt(d.max)],
    ];
    let mut table = Builder::from(rows).build();
    table
        .with(Style::empty())
        .with(Padding::new(2, 2, 0, 0))
        .with(Alignment::right())
        .modify(FirstRow, Alignment::center());
    writeln!(w, "{table}")?;
    Ok(())
}

fn print_steps(w: &mut dyn Write, metrics: &Metrics) -> Result<(), ReporterError> {
    writeln!(w, "{}", h1("Steps"))?;
    let mut builder = Builder::default();
    builder.push_record(["Step", "Count", "Success", "Failed", "Rate", "P95"]);
    for (name, step) in &metrics.steps {
        builder.push_record([
            name.clone(),
            step.count.to_string(),
            step.success.to_string(),
            step.failed.to_string(),
            format!("{:.2}%", step.success_rate),
            fmt(step.durations.p95),
        ]);
    }
    let mut table = builder.build();
    table
        .with(Style::empty())
        .with(Padding::new(2, 2, 0, 0))
        .modify(FirstRow, Alignment::center())
        .modify(Columns::new(1..), Alignment::right());
    writeln!(w, "{table}")?;
    Ok(())
}

fn print_thresholds(w: &mut dyn Write, thresholds: &ThresholdResults) -> Result<(), ReporterError> {
    writeln!(w, "{}", h1("Thresholds"))?;
    for result in &thresholds.results {
        let mark = if result.passed { "✓".green() } else { "✗".red() };
        writeln!(w, "  {mark} {} (threshold {}, actual {})", result.name, result.threshold, result.actual)?;
    }
    if thresholds.results.is_empty() {
        writeln!(w, "  (none configured)")?;
    }
    Ok(())
}

fn fmt(d: std::time::Duration) -> String {
    format!("{:.2}", FormattedDuration::from(d, d.appropriate_unit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;
    use crate::threshold::{self, Thresholds};
    use std::time::Duration;

    #[test]
    fn summary_prints_request_count() {
        let metrics = metrics::compute(&[], Duration::from_secs(1));
        let mut buf = Vec::new();
        TextFormatter.print(&mut buf, &metrics, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("0 requests"));
    }

    #[test]
    fn failing_threshold_prints_a_cross_mark() {
        let metrics = metrics::compute(&[], Duration::from_secs(1));
        let thresholds = Thresholds { max_failure_rate: Some(1.0), ..Default::default() };
        let evaluated = threshold::evaluate(&thresholds, &metrics);
        let mut buf = Vec::new();
        TextFormatter.print(&mut buf, &metrics, Some(&evaluated)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("✓") || text.contains("✗"));
    }
}
