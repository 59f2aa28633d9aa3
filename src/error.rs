//! Error taxonomy for the load engine.
//!
//! Each subsystem gets its own [`thiserror::Error`] enum instead of one giant
//! error type, so callers can match on exactly the failure modes a given API
//! can produce. See spec §7 for the kind-to-propagation table this mirrors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the YAML configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML document failed to parse.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path of the offending document.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The config parsed but failed semantic validation.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A duration string (e.g. phase duration) could not be parsed.
    #[error("invalid duration {value:?}: {source}")]
    Duration {
        /// The offending literal.
        value: String,
        /// Underlying parse error.
        #[source]
        source: humantime::DurationError,
    },

    /// A percentage string (e.g. `http_req_failed.rate`) was malformed.
    #[error("invalid percentage {0:?}: expected a value like \"1%\"")]
    Percentage(String),
}

/// Errors raised while substituting `${...}` placeholders in a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `${env:NAME}` referenced an environment variable that isn't set.
    #[error("env var {0} not set")]
    MissingEnv(String),

    /// `${name}` referenced a variable not present in the current scope.
    #[error("variable {0} not found")]
    MissingVariable(String),

    /// A recognized built-in function was called with invalid arguments.
    #[error("invalid arguments to {func}(): {reason}")]
    InvalidArgs {
        /// Function name.
        func: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Multiple accumulated [`TemplateError`]s from one substitution pass.
///
/// Substitution never stops at the first bad placeholder (spec §4.4); all
/// errors found in one template are collected and reported together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", join_errors(.0))]
pub struct TemplateErrors(pub Vec<TemplateError>);

fn join_errors(errors: &[TemplateError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Errors raised while extracting variables from a JSON response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The JSON-path did not resolve to any value in the body.
    #[error("path {path} not found for variable {name}")]
    NotFound {
        /// The variable name the extraction was bound to.
        name: String,
        /// The JSON-path expression.
        path: String,
    },

    /// The JSON-path expression itself could not be parsed.
    #[error("invalid json-path {0:?}")]
    InvalidPath(String),

    /// The response body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors surfaced by a single [`crate::step::StepConfig`] execution that abort
/// the containing workflow iteration (as opposed to HTTP 4xx/5xx, which are
/// recorded as a failed [`crate::event::Event`] without aborting, spec §4.6).
#[derive(Debug, Error)]
pub enum StepError {
    /// Template substitution failed for the URL, body, or a header value.
    #[error(transparent)]
    Template(#[from] TemplateErrors),

    /// Variable extraction failed after a successful response.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A transport-level failure: connect, DNS, TLS, or timeout.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors raised while running one workflow iteration.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step aborted the iteration; see [`StepError`] for the cause.
    #[error("step {step} failed: {source}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// Underlying step error.
        #[source]
        source: StepError,
    },
}

/// Errors raised while loading a [`crate::datasource::DataSource`].
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// The backing file could not be opened.
    #[error("failed to open data source file {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The CSV file could not be parsed.
    #[error("failed to parse CSV data source {path}: {source}")]
    Csv {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: csv::Error,
    },

    /// The JSON file could not be parsed.
    #[error("failed to parse JSON data source {path}: {source}")]
    Json {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A JSON data source did not contain a top-level array of objects.
    #[error("JSON data source {0} must be an array of objects")]
    NotAnArray(PathBuf),

    /// The data source contained zero rows.
    #[error("data source {0} is empty")]
    Empty(PathBuf),
}

/// Errors raised while formatting a final report.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Writing the formatted report failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the report to JSON failed.
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
