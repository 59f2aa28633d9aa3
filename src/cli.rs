//! CLI surface for the `rltf` binary (§6.2).
//!
//! Mirrors the teacher's `BenchCli`/`run` split: a `clap`-derived options
//! struct with the override-resolution logic living in its own inherent
//! methods, and a free `run` function that wires options, config, and output
//! together. Unlike the teacher (one flat run against a fixed concurrency),
//! `run` branches on whether the loaded document configures a `loadProfile`:
//! if so the coordinator drives [`crate::phase::PhaseManager`]; otherwise it
//! falls back to the `--actors`/`--duration` flags.

use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock::Clock;
use crate::collector::Collector;
use crate::config::{self, Config};
use crate::coordinator::Coordinator;
use crate::metrics;
use crate::output::{JsonFormatter, OutputFormatter, TextFormatter};
use crate::phase::PhaseManager;
use crate::rate_limiter::RateLimiter;
use crate::runner::RunnerConfig;
use crate::threshold;
use crate::workflow::Workflow;

/// Command-line options for the `rltf` binary.
#[derive(Parser, Clone, Debug)]
pub struct Cli {
    /// Path to the YAML workload document.
    #[clap(long)]
    pub config: PathBuf,

    /// Fixed actor count to run, when the document has no `loadProfile`.
    #[clap(long, default_value = "5")]
    pub actors: u64,

    /// Run duration, when the document has no `loadProfile`.
    ///
    /// Examples: --duration 10s, --duration 5m.
    #[clap(long, default_value = "10s")]
    pub duration: humantime::Duration,

    /// Output format for the final report.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Suppress the final report; only the exit code reflects the result.
    #[clap(long)]
    pub quiet: bool,

    /// Emit `tracing` logs at debug level instead of info.
    #[clap(long)]
    pub verbose: bool,

    /// Hard cap on iterations per actor; 0 means unlimited.
    #[clap(long, default_value = "0")]
    pub max_iterations: u64,

    /// Leading iterations per actor excluded from metrics.
    #[clap(long, default_value = "0")]
    pub warmup: u64,
}

/// Final report format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text, for a terminal.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Process exit codes per §6.2.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// All thresholds passed (or none configured), or the run was
    /// interrupted by SIGINT/SIGTERM.
    Success = 0,
    /// At least one configured threshold failed.
    ThresholdFailure = 1,
    /// The configuration document was missing or invalid.
    ConfigError = 2,
}

/// Loads the configured document, runs the engine to completion (or until
/// interrupted), prints the final report, and returns the process exit code.
pub async fn run(cli: Cli) -> ExitCode {
    let config = match config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::ConfigError;
        }
    };

    let (reporter, collector) = Collector::new(crate::collector::DEFAULT_CAPACITY);
    let workflow =
        Arc::new(Workflow::new(config.workflow.clone(), Client::new(), config.sources.clone()));

    let ctx = CancellationToken::new();
    let shutdown = ctx.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.cancel();
    });

    {
        let coordinator = Coordinator::new(reporter);
        let runner_cfg = RunnerConfig {
            max_iterations: cli.max_iterations.max(config.runner.max_iterations),
            warmup_iters: cli.warmup.max(config.runner.warmup_iters),
        };

        match &config.load_profile {
            Some(profile) => {
                info!(phases = profile.phases().len(), "running phased load profile");
                let clock = Clock::new_paused();
                clock.resume();
                let phases = PhaseManager::new(profile.clone(), clock);
                let limiter = profile
                    .phases()
                    .iter()
                    .any(|p| p.rps.is_some())
                    .then(|| RateLimiter::new(0));
                coordinator
                    .run_with_profile(&ctx, phases, workflow, limiter, Some(runner_cfg))
                    .await;
            }
            None => {
                info!(actors = cli.actors, duration = ?cli.duration, "running fixed-actor load");
                coordinator.spawn_with_config(&ctx, cli.actors, workflow, runner_cfg);
                tokio::select! {
                    _ = tokio::time::sleep(cli.duration.into()) => {}
                    _ = ctx.cancelled() => {}
                }
                ctx.cancel();
            }
        }

        coordinator.wait().await;
    }

    collector.close().await;
    let metrics = metrics::compute(&collector.events(), collector.duration());
    let evaluated = threshold::evaluate(&config.thresholds, &metrics);
    let thresholds = has_any_threshold(&config).then_some(&evaluated);

    if !cli.quiet {
        let formatter: &dyn OutputFormatter = match cli.output {
            OutputFormat::Text => &TextFormatter,
            OutputFormat::Json => &JsonFormatter,
        };
        if let Err(e) = formatter.print(&mut stdout(), &metrics, thresholds) {
            eprintln!("failed to print report: {e}");
        }
    }

    if thresholds.is_some_and(|t| !t.passed) {
        ExitCode::ThresholdFailure
    } else {
        ExitCode::Success
    }
}

fn has_any_threshold(config: &Config) -> bool {
    let t = &config.thresholds;
    !t.avg.is_zero()
        || !t.p50.is_zero()
        || !t.p90.is_zero()
        || !t.p95.is_zero()
        || !t.p99.is_zero()
        || t.max_failure_rate.is_some()
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_presence_requires_a_nonzero_gate() {
        let config = Config {
            workflow: crate::workflow::WorkflowConfig { name: "w".to_string(), steps: vec![] },
            sources: crate::datasource::Sources::default(),
            load_profile: None,
            thresholds: Default::default(),
            runner: RunnerConfig::default(),
        };
        assert!(!has_any_threshold(&config));
    }
}
