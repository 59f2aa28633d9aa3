//! Spawns and terminates actors, and drives the phase loop (§4.10).
//!
//! Grounded in the teacher's `Runner::run` spawn loop (`JoinSet`, a
//! per-worker stop signal alongside the global `CancellationToken`), but
//! generalized from one static worker count started once to actors that the
//! phase loop starts and stops at arbitrary times.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collector::Reporter;
use crate::phase::PhaseManager;
use crate::rate_limiter::RateLimiter;
use crate::runner::{RunOutcome, Runner, RunnerConfig};
use crate::workflow::Workflow;

/// Interval of the phase loop's scale/rate-adjustment ticker.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period added beyond a profile's total duration before the phase
/// loop gives up waiting for it to self-report completion.
const PROFILE_GRACE: Duration = Duration::from_secs(5);

struct ActorHandle {
    actor_id: u64,
    stop: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns actor lifecycle: id generation, the active set, and per-actor stop
/// signals.
pub struct Coordinator {
    next_actor_id: Mutex<u64>,
    tasks: Mutex<Vec<ActorHandle>>,
    stop_queue: Mutex<VecDeque<CancellationToken>>,
    reporter: Reporter,
}

impl Coordinator {
    /// Builds a coordinator that reports events through `reporter`.
    pub fn new(reporter: Reporter) -> Self {
        Self {
            next_actor_id: Mutex::new(0),
            tasks: Mutex::new(Vec::new()),
            stop_queue: Mutex::new(VecDeque::new()),
            reporter,
        }
    }

    /// Exact count of live actors (I4: eventually consistent within one tick).
    pub fn active_actors(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.join.is_finished()).count()
    }

    /// Fire-and-forget launch of `count` actors with no iteration cap and no
    /// rate limiter; used when no `LoadProfile` is configured.
    pub fn spawn(&self, ctx: &CancellationToken, count: u64, workflow: Arc<Workflow>) {
        for _ in 0..count {
            self.spawn_actor(ctx.clone(), workflow.clone(), None, None);
        }
    }

    /// Like [`Self::spawn`], but each actor wraps its workflow in a
    /// [`Runner`]; when the runner returns `MaxIterationsReached` the actor
    /// exits cleanly.
    pub fn spawn_with_config(
        &self,
        ctx: &CancellationToken,
        count: u64,
        workflow: Arc<Workflow>,
        runner_cfg: RunnerConfig,
    ) {
        for _ in 0..count {
            self.spawn_actor(ctx.clone(), workflow.clone(), Some(runner_cfg), None);
        }
    }

    /// Drives the phase loop: on a 100ms ticker, scale the actor population
    /// to the profile's current target and retune the rate limiter, until
    /// the context is cancelled or the profile completes. An outer deadline
    /// of the profile's total duration plus a grace period bounds the loop
    /// even if a spawned actor never observes cancellation.
    pub async fn run_with_profile(
        &self,
        ctx: &CancellationToken,
        phases: PhaseManager,
        workflow: Arc<Workflow>,
        limiter: Option<RateLimiter>,
        runner_cfg: Option<RunnerConfig>,
    ) {
        let deadline = phases.total_duration() + PROFILE_GRACE;
        let drive = async {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            let mut last_phase_index = usize::MAX;

            loop {
                ticker.tick().await;

                if ctx.is_cancelled() || phases.is_complete() {
                    return;
                }

                let phase_index = phases.current_phase_index();
                if phase_index != last_phase_index {
                    info!(phase_index, "phase transition");
                    last_phase_index = phase_index;
                }

                let target = phases.target_actors();
                let current = self.active_actors() as u64;
                if current < target {
                    for _ in 0..(target - current) {
                        self.spawn_actor(ctx.clone(), workflow.clone(), runner_cfg, limiter.clone());
                    }
                } else if current > target {
                    self.stop_oldest((current - target) as usize);
                }

                if let Some(limiter) = &limiter {
                    limiter.set_rate(phases.current_rps());
                }
            }
        };

        if tokio::time::timeout(deadline, drive).await.is_err() {
            warn!(?deadline, "profile loop exceeded grace deadline, forcing stop");
        }
        self.stop_all();
    }

    /// Blocks until every spawned actor has terminated.
    pub async fn wait(&self) {
        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.join.await {
                if e.is_panic() {
                    warn!(actor_id = handle.actor_id, "actor panicked");
                    self.reporter.report_panic(handle.actor_id, &panic_payload(&e));
                }
            }
        }
    }

    fn stop_all(&self) {
        let tokens: Vec<_> = self.stop_queue.lock().drain(..).collect();
        for token in tokens {
            token.cancel();
        }
    }

    fn stop_oldest(&self, count: usize) {
        let mut queue = self.stop_queue.lock();
        for _ in 0..count {
            if let Some(token) = queue.pop_front() {
                token.cancel();
            }
        }
    }

    fn spawn_actor(
        &self,
        ctx: CancellationToken,
        workflow: Arc<Workflow>,
        runner_cfg: Option<RunnerConfig>,
        limiter: Option<RateLimiter>,
    ) {
        let actor_id = {
            let mut next = self.next_actor_id.lock();
            *next += 1;
            *next
        };
        let stop = CancellationToken::new();
        self.stop_queue.lock().push_back(stop.clone());

        let reporter = self.reporter.clone();
        let join = tokio::spawn(actor_loop(actor_id, ctx, stop.clone(), workflow, runner_cfg, limiter, reporter));
        self.tasks.lock().push(ActorHandle { actor_id, stop, join });
    }
}

fn panic_payload(e: &tokio::task::JoinError) -> String {
    e.try_into_panic()
        .ok()
        .and_then(|p| {
            p.downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| p.downcast_ref::<String>().cloned())
        })
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

async fn actor_loop(
    actor_id: u64,
    ctx: CancellationToken,
    stop: CancellationToken,
    workflow: Arc<Workflow>,
    runner_cfg: Option<RunnerConfig>,
    limiter: Option<RateLimiter>,
    reporter: Reporter,
) {
    use crate::workflow::EventSink;

    let mut runner = runner_cfg.map(Runner::new);
    loop {
        if ctx.is_cancelled() || stop.is_cancelled() {
            return;
        }

        if let Some(limiter) = &limiter {
            tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                _ = ctx.cancelled() => return,
                res = limiter.wait(&ctx) => {
                    if res.is_err() {
                        return;
                    }
                }
            }
        }

        match &mut runner {
            Some(runner) => {
                match runner.run_iteration(&workflow, actor_id, &reporter, &ctx).await {
                    Ok(RunOutcome::Completed) => {}
                    Ok(RunOutcome::MaxIterationsReached) => return,
                    Err(e) => warn!(actor_id, error = %e, "iteration aborted"),
                }
            }
            None => {
                if let Err(e) = workflow.run(actor_id, &reporter, &ctx).await {
                    warn!(actor_id, error = %e, "iteration aborted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::datasource::Sources;
    use crate::phase::{LoadProfile, Phase, PhaseShape};
    use crate::step::StepConfig;
    use crate::workflow::WorkflowConfig;
    use reqwest::Client;

    fn trivial_workflow() -> Arc<Workflow> {
        Arc::new(Workflow::new(
            WorkflowConfig {
                name: "w".to_string(),
                steps: vec![StepConfig {
                    name: "noop".to_string(),
                    method: reqwest::Method::GET,
                    url: "http://127.0.0.1:1/".to_string(),
                    headers: Default::default(),
                    body: None,
                    extract: Default::default(),
                }],
            },
            Client::new(),
            Sources::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn profile_completion_drains_all_actors() {
        let (reporter, _collector) = crate::collector::Collector::new(1024);
        let coordinator = Coordinator::new(reporter);
        let ctx = CancellationToken::new();
        let clock = Clock::new_paused();
        clock.resume();
        let profile = LoadProfile::new(vec![Phase {
            name: "steady".to_string(),
            duration: Duration::from_millis(300),
            shape: PhaseShape::Steady { actors: 2 },
            rps: None,
        }]);
        let phases = PhaseManager::new(profile, clock);

        coordinator.run_with_profile(&ctx, phases, trivial_workflow(), None, None).await;
        coordinator.wait().await;
        assert_eq!(coordinator.active_actors(), 0);
    }
}
