//! Per-actor iteration control: enforces `max_iterations` and routes warmup
//! iterations to a null sink.
//!
//! The teacher's `Runner<BS>` both spawned the worker pool and tracked this
//! bookkeeping; here spawn/scale moved to [`crate::coordinator`] and this
//! keeps only the single-actor iteration loop, generalized from one static
//! worker count to actors the coordinator can start and stop at any time.

use tokio_util::sync::CancellationToken;

use crate::error::WorkflowError;
use crate::workflow::{EventSink, NullSink, Workflow};

/// `max_iterations`/`warmup_iters` for one actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerConfig {
    /// Hard cap on iterations for this actor; 0 means unlimited.
    pub max_iterations: u64,
    /// Number of leading iterations whose events are discarded.
    pub warmup_iters: u64,
}

/// Result of one [`Runner::run_iteration`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The iteration ran (successfully or with an HTTP status failure).
    Completed,
    /// `max_iterations` was already reached before this call; treated as a
    /// clean actor exit, not an error.
    MaxIterationsReached,
}

/// Single-threaded, per-actor iteration counter. One instance per worker task.
pub struct Runner {
    config: RunnerConfig,
    iterations_done: u64,
}

impl Runner {
    /// Builds a runner for one actor.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, iterations_done: 0 }
    }

    /// Number of iterations this runner has completed so far.
    pub fn iterations_done(&self) -> u64 {
        self.iterations_done
    }

    /// Runs the next iteration, if the iteration cap allows it.
    ///
    /// Warmup iterations are routed to a null sink so their events never
    /// reach `real_sink`/the collector.
    pub async fn run_iteration(
        &mut self,
        workflow: &Workflow,
        actor_id: u64,
        real_sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, WorkflowError> {
        if self.config.max_iterations > 0 && self.iterations_done >= self.config.max_iterations {
            return Ok(RunOutcome::MaxIterationsReached);
        }

        let result = if self.iterations_done < self.config.warmup_iters {
            workflow.run(actor_id, &NullSink, cancel).await
        } else {
            workflow.run(actor_id, real_sink, cancel).await
        };
        self.iterations_done += 1;
        result.map(|()| RunOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::Sources;
    use crate::step::StepConfig;
    use crate::workflow::WorkflowConfig;
    use reqwest::Client;
    use std::sync::{Arc, Mutex};

    struct CountingSink(Arc<Mutex<u64>>);
    impl EventSink for CountingSink {
        fn report(&self, _event: crate::event::Event) {
            *self.0.lock().unwrap() += 1;
        }
    }

    fn trivial_workflow() -> Workflow {
        Workflow::new(
            WorkflowConfig { name: "w".to_string(), steps: vec![] },
            Client::new(),
            Sources::default(),
        )
    }

    #[tokio::test]
    async fn max_iterations_reached_after_cap() {
        let mut runner = Runner::new(RunnerConfig { max_iterations: 2, warmup_iters: 0 });
        let workflow = trivial_workflow();
        let sink_count = Arc::new(Mutex::new(0u64));
        let sink = CountingSink(sink_count);
        let cancel = CancellationToken::new();

        assert_eq!(
            runner.run_iteration(&workflow, 1, &sink, &cancel).await.unwrap(),
            RunOutcome::Completed
        );
        assert_eq!(
            runner.run_iteration(&workflow, 1, &sink, &cancel).await.unwrap(),
            RunOutcome::Completed
        );
        assert_eq!(
            runner.run_iteration(&workflow, 1, &sink, &cancel).await.unwrap(),
            RunOutcome::MaxIterationsReached
        );
    }

    #[tokio::test]
    async fn warmup_iterations_skip_the_real_sink() {
        let mut runner = Runner::new(RunnerConfig { max_iterations: 0, warmup_iters: 2 });
        let workflow = Workflow::new(
            WorkflowConfig {
                name: "w".to_string(),
                steps: vec![StepConfig {
                    name: "noop".to_string(),
                    method: reqwest::Method::GET,
                    url: "http://127.0.0.1:0/".to_string(),
                    headers: Default::default(),
                    body: None,
                    extract: Default::default(),
                }],
            },
            Client::new(),
            Sources::default(),
        );
        let sink_count = Arc::new(Mutex::new(0u64));
        let sink = CountingSink(sink_count.clone());
        let cancel = CancellationToken::new();

        // Connection to a closed port fails fast as a transport error, which
        // aborts the iteration without incrementing the counter check here,
        // but still exercises the warmup-vs-real sink routing path above it.
        let _ = runner.run_iteration(&workflow, 1, &sink, &cancel).await;
        assert_eq!(runner.iterations_done(), 1);
        assert_eq!(*sink_count.lock().unwrap(), 0);
    }
}
