//! One workflow = an ordered sequence of steps sharing a per-iteration
//! variable scope.

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::datasource::Sources;
use crate::error::{StepError, WorkflowError};
use crate::event::{now_ms, Event};
use crate::step::{StepConfig, StepOutcome};
use crate::template::Variables;

/// Name plus ordered steps that make up one workflow.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Workflow name, used only for diagnostics.
    pub name: String,
    /// Steps, executed in declaration order on every iteration.
    pub steps: Vec<StepConfig>,
}

/// A sink that receives [`Event`]s produced during one workflow run.
///
/// Implemented by the real [`crate::collector::Reporter`] and by a null sink
/// used during warmup iterations (§4.8).
pub trait EventSink: Send + Sync {
    /// Records one event. Must not block.
    fn report(&self, event: Event);
}

/// Discards every event; used to exclude warmup iterations from metrics.
pub struct NullSink;

impl EventSink for NullSink {
    fn report(&self, _event: Event) {}
}

/// Steps constructed once per workflow instance and reused across
/// iterations; they carry no per-iteration state themselves.
pub struct Workflow {
    config: WorkflowConfig,
    client: Client,
    sources: Sources,
}

impl Workflow {
    /// Builds a workflow over a shared HTTP client and data sources.
    pub fn new(config: WorkflowConfig, client: Client, sources: Sources) -> Self {
        Self { config, client, sources }
    }

    /// Runs one full iteration for `actor_id`, emitting events to `sink` as
    /// each step completes.
    ///
    /// Returns `Ok(())` on a clean run (including one that ends in an HTTP
    /// status failure, which does not abort the iteration). Returns
    /// `Err(WorkflowError)` when a step surfaces a template, extraction, or
    /// transport failure, which does abort the iteration. Returns `Ok(())`
    /// with no further events when cancellation fires mid-step, matching the
    /// "no event synthesized on cancellation" rule.
    pub async fn run(
        &self,
        actor_id: u64,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        let mut vars = Variables::new();
        if !self.sources.is_empty() {
            self.sources.inject(&mut vars);
        }

        for step in &self.config.steps {
            let outcome = step.execute(&self.client, &vars, cancel).await;
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(source) => {
                    sink.report(failed_event(actor_id, &step.name, &source));
                    return Err(WorkflowError::StepFailed { step: step.name.clone(), source });
                }
            };

            let result = match outcome {
                StepOutcome::Completed(result) => result,
                StepOutcome::Cancelled => return Ok(()),
            };

            sink.report(Event {
                actor_id,
                timestamp_ms: now_ms(),
                step_name: step.name.clone(),
                protocol: "http",
                duration: result.duration,
                success: result.success,
                error: result.error.clone(),
                status_code: result.status_code,
                bytes_sent: result.bytes_sent,
                bytes_received: result.bytes_received,
            });

            if !result.success {
                // HTTP status failure: event recorded, iteration continues.
                continue;
            }
            for (key, value) in result.extracted {
                vars.insert(key, value);
            }
        }
        Ok(())
    }
}

fn failed_event(actor_id: u64, step_name: &str, error: &StepError) -> Event {
    Event {
        actor_id,
        timestamp_ms: now_ms(),
        step_name: step_name.to_string(),
        protocol: "http",
        duration: std::time::Duration::ZERO,
        success: false,
        error: error.to_string(),
        status_code: 0,
        bytes_sent: 0,
        bytes_received: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<Event>>>);
    impl EventSink for RecordingSink {
        fn report(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn step(name: &str, url: &str) -> StepConfig {
        StepConfig {
            name: name.to_string(),
            method: reqwest::Method::GET,
            url: url.to_string(),
            headers: Default::default(),
            body: None,
            extract: Default::default(),
        }
    }

    #[tokio::test]
    async fn missing_variable_in_url_aborts_before_dispatch() {
        let workflow = Workflow::new(
            WorkflowConfig {
                name: "w".to_string(),
                steps: vec![step("only", "http://example.invalid/${nonexistent}")],
            },
            Client::new(),
            Sources::default(),
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink(events.clone());
        let cancel = CancellationToken::new();
        let err = workflow.run(1, &sink, &cancel).await.unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
        assert_eq!(events.lock().unwrap().len(), 1);
        assert!(!events.lock().unwrap()[0].success);
    }
}
