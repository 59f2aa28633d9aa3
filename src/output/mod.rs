//! Final report formatters over a computed [`crate::metrics::Metrics`] value.
//!
//! Grounded in the teacher's `reporter/mod.rs` trait shape (one `print`
//! method per format), restructured around this spec's `Metrics` and
//! `ThresholdResults` instead of the teacher's `BenchReport`. The teacher's
//! baseline-comparison parameter is dropped: nothing in this system persists
//! cross-run state to compare against.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use std::io::Write;

use crate::error::ReporterError;
use crate::metrics::Metrics;
use crate::threshold::ThresholdResults;

/// Formats a run's final [`Metrics`] (and optional [`ThresholdResults`]) to a
/// writer.
pub trait OutputFormatter {
    /// Writes the formatted report to `w`.
    fn print(
        &self,
        w: &mut dyn Write,
        metrics: &Metrics,
        thresholds: Option<&ThresholdResults>,
    ) -> Result<(), ReporterError>;
}
