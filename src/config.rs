//! Loads and validates the YAML workload document (§6), lowering it into the
//! core's frozen runtime types.
//!
//! Mirrors the teacher's separation of `BenchCli` (raw, deserialized) from
//! `BenchOpts` (validated runtime options): [`raw`] holds the `Deserialize`
//! shapes that mirror the document verbatim, and [`load`] validates and lowers
//! them into [`Config`].

use std::path::{Path, PathBuf};

use reqwest::Method;

use crate::datasource::{self, SelectionMode, Sources};
use crate::error::{ConfigError, DataSourceError};
use crate::phase::{LoadProfile, Phase, PhaseShape};
use crate::runner::RunnerConfig;
use crate::step::StepConfig;
use crate::threshold::{self, Thresholds};
use crate::workflow::WorkflowConfig;

/// `Deserialize`-only shapes mirroring the YAML document in §6 verbatim.
pub mod raw {
    use serde::Deserialize;
    use std::collections::HashMap;

    /// Top-level document shape.
    #[derive(Debug, Deserialize)]
    pub struct Document {
        /// The workflow to run on every iteration.
        pub workflow: Workflow,
        /// Time-phased concurrency profile, if configured.
        #[serde(rename = "loadProfile")]
        pub load_profile: Option<LoadProfileDoc>,
        /// Post-run pass/fail gates.
        pub thresholds: Option<Thresholds>,
        /// Per-actor iteration caps.
        pub execution: Option<Execution>,
    }

    /// Raw workflow shape: name, steps, and named data sources.
    #[derive(Debug, Deserialize)]
    pub struct Workflow {
        /// Workflow name, used only for diagnostics.
        pub name: String,
        /// Steps, executed in declaration order on every iteration.
        pub steps: Vec<Step>,
        /// Named data sources referenced by steps via `${data.<name>.<field>}`.
        pub data: Option<HashMap<String, DataSource>>,
    }

    /// Raw step shape.
    #[derive(Debug, Deserialize)]
    pub struct Step {
        /// Step name, used for diagnostics and per-step metrics.
        pub name: String,
        /// HTTP method; defaults to `GET`.
        #[serde(default = "default_method")]
        pub method: String,
        /// Request URL, may contain `${...}` placeholders.
        pub url: String,
        /// Request headers; values may contain `${...}` placeholders.
        #[serde(default)]
        pub headers: HashMap<String, String>,
        /// Request body, may contain `${...}` placeholders.
        pub body: Option<String>,
        /// Variable name to JSON-path mapping, extracted from the response body.
        #[serde(default)]
        pub extract: HashMap<String, String>,
    }

    fn default_method() -> String {
        "GET".to_string()
    }

    /// Raw data source shape.
    #[derive(Debug, Deserialize)]
    pub struct DataSource {
        /// Path to the CSV or JSON file backing this source.
        pub file: std::path::PathBuf,
        /// Selection mode: `sequential` or `random`; defaults to `sequential`.
        #[serde(default = "default_mode")]
        pub mode: String,
    }

    fn default_mode() -> String {
        "sequential".to_string()
    }

    /// Raw load profile shape.
    #[derive(Debug, Deserialize)]
    pub struct LoadProfileDoc {
        /// Ordered phases making up the profile.
        pub phases: Vec<Phase>,
    }

    /// Raw phase shape.
    #[derive(Debug, Deserialize)]
    pub struct Phase {
        /// Human-readable name, used for transition notifications.
        pub name: String,
        /// Duration literal, e.g. `"30s"`.
        pub duration: String,
        /// Fixed actor count for the whole phase; takes priority over ramp fields.
        pub actors: Option<u64>,
        /// Actor count at the start of a ramp phase.
        #[serde(rename = "startActors")]
        pub start_actors: Option<u64>,
        /// Actor count at the end of a ramp phase.
        #[serde(rename = "endActors")]
        pub end_actors: Option<u64>,
        /// Requests-per-second ceiling for this phase.
        pub rps: Option<u64>,
    }

    /// Raw threshold shape.
    #[derive(Debug, Deserialize)]
    pub struct Thresholds {
        /// Duration ceilings keyed by percentile.
        pub http_req_duration: Option<DurationThresholds>,
        /// Failure-rate ceiling.
        pub http_req_failed: Option<FailureThreshold>,
    }

    /// Raw duration-ceiling shape.
    #[derive(Debug, Deserialize)]
    pub struct DurationThresholds {
        /// Ceiling for the overall average duration.
        pub avg: Option<String>,
        /// Ceiling for the 50th percentile.
        pub p50: Option<String>,
        /// Ceiling for the 90th percentile.
        pub p90: Option<String>,
        /// Ceiling for the 95th percentile.
        pub p95: Option<String>,
        /// Ceiling for the 99th percentile.
        pub p99: Option<String>,
    }

    /// Raw failure-rate ceiling shape.
    #[derive(Debug, Deserialize)]
    pub struct FailureThreshold {
        /// Percentage literal, e.g. `"1%"`.
        pub rate: String,
    }

    /// Raw execution shape.
    #[derive(Debug, Deserialize)]
    pub struct Execution {
        /// Hard cap on iterations per actor.
        pub max_iterations: Option<u64>,
        /// Leading iterations per actor excluded from metrics.
        pub warmup_iterations: Option<u64>,
    }
}

/// The validated, runnable form of a configuration document.
pub struct Config {
    /// The workflow to run on every iteration.
    pub workflow: WorkflowConfig,
    /// Data sources referenced by the workflow's steps.
    pub sources: Sources,
    /// Time-phased concurrency profile, if the document configures one.
    pub load_profile: Option<LoadProfile>,
    /// Post-run pass/fail gates.
    pub thresholds: Thresholds,
    /// Per-actor iteration caps.
    pub runner: RunnerConfig,
}

/// Reads, parses, and validates the document at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let doc: raw::Document = serde_yaml::from_str(&text)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    lower(doc)
}

fn lower(doc: raw::Document) -> Result<Config, ConfigError> {
    let mut sources_vec = Vec::new();
    if let Some(data) = &doc.workflow.data {
        for (name, source) in data {
            let mode = parse_mode(&source.mode)?;
            let loaded = datasource::load(&source.file, mode)
                .map_err(|e| ConfigError::Invalid(format_data_source_error(&source.file, &e)))?;
            sources_vec.push((name.clone(), std::sync::Arc::new(loaded)));
        }
    }
    let sources = Sources::new(sources_vec);

    let steps = doc
        .workflow
        .steps
        .into_iter()
        .map(lower_step)
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let workflow = WorkflowConfig { name: doc.workflow.name, steps };

    let load_profile = match doc.load_profile {
        Some(raw_profile) => Some(lower_load_profile(raw_profile)?),
        None => None,
    };

    let thresholds = match doc.thresholds {
        Some(raw_thresholds) => lower_thresholds(raw_thresholds)?,
        None => Thresholds::default(),
    };

    let runner = match doc.execution {
        Some(exec) => RunnerConfig {
            max_iterations: exec.max_iterations.unwrap_or(0),
            warmup_iters: exec.warmup_iterations.unwrap_or(0),
        },
        None => RunnerConfig::default(),
    };

    Ok(Config { workflow, sources, load_profile, thresholds, runner })
}

fn lower_step(step: raw::Step) -> Result<StepConfig, ConfigError> {
    let method = step
        .method
        .parse::<Method>()
        .map_err(|_| ConfigError::Invalid(format!("unknown HTTP method {:?}", step.method)))?;
    Ok(StepConfig {
        name: step.name,
        method,
        url: step.url,
        headers: step.headers,
        body: step.body,
        extract: step.extract,
    })
}

fn lower_load_profile(doc: raw::LoadProfileDoc) -> Result<LoadProfile, ConfigError> {
    let phases = doc.phases.into_iter().map(lower_phase).collect::<Result<Vec<_>, _>>()?;
    Ok(LoadProfile::new(phases))
}

fn lower_phase(phase: raw::Phase) -> Result<Phase, ConfigError> {
    let duration = parse_duration(&phase.duration)?;
    let shape = match phase.actors {
        Some(actors) => PhaseShape::Steady { actors },
        None => {
            let start = phase.start_actors.ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "phase {:?} needs either actors or startActors/endActors",
                    phase.name
                ))
            })?;
            let end = phase.end_actors.ok_or_else(|| {
                ConfigError::Invalid(format!("phase {:?} is missing endActors", phase.name))
            })?;
            PhaseShape::Ramp { start, end }
        }
    };
    Ok(Phase { name: phase.name, duration, shape, rps: phase.rps })
}

fn lower_thresholds(doc: raw::Thresholds) -> Result<Thresholds, ConfigError> {
    let mut thresholds = Thresholds::default();
    if let Some(d) = doc.http_req_duration {
        if let Some(v) = d.avg {
            thresholds.avg = parse_duration(&v)?;
        }
        if let Some(v) = d.p50 {
            thresholds.p50 = parse_duration(&v)?;
        }
        if let Some(v) = d.p90 {
            thresholds.p90 = parse_duration(&v)?;
        }
        if let Some(v) = d.p95 {
            thresholds.p95 = parse_duration(&v)?;
        }
        if let Some(v) = d.p99 {
            thresholds.p99 = parse_duration(&v)?;
        }
    }
    if let Some(f) = doc.http_req_failed {
        thresholds.max_failure_rate = Some(threshold::parse_percentage(&f.rate)?);
    }
    Ok(thresholds)
}

fn parse_duration(value: &str) -> Result<std::time::Duration, ConfigError> {
    humantime::parse_duration(value)
        .map_err(|source| ConfigError::Duration { value: value.to_string(), source })
}

fn parse_mode(mode: &str) -> Result<SelectionMode, ConfigError> {
    match mode {
        "sequential" => Ok(SelectionMode::Sequential),
        "random" => Ok(SelectionMode::Random),
        other => Err(ConfigError::Invalid(format!("unknown data source mode {other:?}"))),
    }
}

fn format_data_source_error(path: &PathBuf, e: &DataSourceError) -> String {
    format!("data source {}: {e}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
workflow:
  name: smoke
  steps:
    - name: health
      url: "http://127.0.0.1:0/health"
"#
    }

    #[test]
    fn minimal_document_lowers_with_defaults() {
        let doc: raw::Document = serde_yaml::from_str(minimal_yaml()).unwrap();
        let config = lower(doc).unwrap();
        assert_eq!(config.workflow.steps.len(), 1);
        assert_eq!(config.workflow.steps[0].method, Method::GET);
        assert!(config.load_profile.is_none());
        assert_eq!(config.runner.max_iterations, 0);
    }

    #[test]
    fn ramp_phase_requires_both_endpoints() {
        let yaml = r#"
workflow:
  name: w
  steps:
    - name: s
      url: "http://x/"
loadProfile:
  phases:
    - name: ramp
      duration: "1s"
      startActors: 1
"#;
        let doc: raw::Document = serde_yaml::from_str(yaml).unwrap();
        assert!(lower(doc).is_err());
    }

    #[test]
    fn steady_actors_take_priority_over_ramp_fields() {
        let yaml = r#"
workflow:
  name: w
  steps:
    - name: s
      url: "http://x/"
loadProfile:
  phases:
    - name: p
      duration: "1s"
      actors: 4
"#;
        let doc: raw::Document = serde_yaml::from_str(yaml).unwrap();
        let config = lower(doc).unwrap();
        let phase = &config.load_profile.unwrap().phases()[0];
        assert_eq!(phase.shape, PhaseShape::Steady { actors: 4 });
    }

    #[test]
    fn bad_percentage_is_a_config_error() {
        let yaml = r#"
workflow:
  name: w
  steps:
    - name: s
      url: "http://x/"
thresholds:
  http_req_failed:
    rate: "not-a-percent"
"#;
        let doc: raw::Document = serde_yaml::from_str(yaml).unwrap();
        assert!(lower(doc).is_err());
    }
}
