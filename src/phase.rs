//! Time-phased concurrency profiles.
//!
//! A [`LoadProfile`] is an ordered sequence of [`Phase`]s; [`PhaseManager`]
//! turns elapsed time against that sequence into a target actor count and
//! current RPS, the way the teacher's `BenchPhase` turned worker-setup
//! progress into a single intra-run state. Here phases describe *inter-run*
//! time, not setup/warmup/bench progress of one flat run.

use crate::clock::Clock;
use std::time::Duration;

/// The concurrency shape of one phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhaseShape {
    /// Fixed actor count for the whole phase.
    Steady {
        /// Target actor count (may be 0).
        actors: u64,
    },
    /// Actor count interpolates linearly from `start` to `end`.
    Ramp {
        /// Actor count at the start of the phase.
        start: u64,
        /// Actor count at the end of the phase.
        end: u64,
    },
}

/// One immutable, time-bounded segment of a [`LoadProfile`].
#[derive(Clone, Debug)]
pub struct Phase {
    /// Human-readable name, used for transition notifications.
    pub name: String,
    /// Duration of this phase; must be greater than zero.
    pub duration: Duration,
    /// The concurrency shape for this phase.
    pub shape: PhaseShape,
    /// Requests-per-second ceiling for this phase; `None` means no override.
    pub rps: Option<u64>,
}

impl Phase {
    /// Target actor count at `phase_elapsed` into this phase.
    ///
    /// Steady phases with a nonzero actor count always win over a ramp
    /// shape, per the data model's tie-break rule.
    fn target_actors(&self, phase_elapsed: Duration) -> u64 {
        match self.shape {
            PhaseShape::Steady { actors } if actors > 0 => actors,
            PhaseShape::Steady { actors } => actors,
            PhaseShape::Ramp { start, end } => {
                let frac = if self.duration.is_zero() {
                    1.0
                } else {
                    (phase_elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
                };
                let delta = end as f64 - start as f64;
                (start as f64 + (delta * frac).floor()) as u64
            }
        }
    }
}

/// An ordered sequence of [`Phase`]s executed back to back with no gaps.
///
/// Invariant: the profile's total duration is the sum of its phases'
/// durations.
#[derive(Clone, Debug)]
pub struct LoadProfile {
    phases: Vec<Phase>,
}

impl LoadProfile {
    /// Builds a profile from an ordered list of phases.
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// The phases making up this profile, in execution order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Total duration across all phases.
    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

/// Drives a [`LoadProfile`] against a [`Clock`], reporting the current phase
/// index, target actor count, and RPS for the coordinator's tick loop.
pub struct PhaseManager {
    profile: LoadProfile,
    clock: Clock,
}

impl PhaseManager {
    /// Constructs a manager over a frozen profile and a clock that has
    /// already been started (resumed) by the caller.
    pub fn new(profile: LoadProfile, clock: Clock) -> Self {
        Self { profile, clock }
    }

    /// Time elapsed on the underlying clock since it started running.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Total duration of the underlying profile, summed across its phases.
    pub fn total_duration(&self) -> Duration {
        self.profile.total_duration()
    }

    /// Index of the phase containing `elapsed()`.
    ///
    /// Returns `len(phases)` once every phase has been consumed. At exactly
    /// a phase boundary, the next phase is considered active.
    pub fn current_phase_index(&self) -> usize {
        let elapsed = self.elapsed();
        let mut cumulative = Duration::ZERO;
        for (i, phase) in self.profile.phases().iter().enumerate() {
            cumulative += phase.duration;
            if cumulative > elapsed {
                return i;
            }
        }
        self.profile.phases().len()
    }

    /// Whether every phase has been consumed.
    pub fn is_complete(&self) -> bool {
        self.current_phase_index() == self.profile.phases().len()
    }

    /// Target actor count for the current instant.
    ///
    /// Zero once the profile is complete.
    pub fn target_actors(&self) -> u64 {
        let idx = self.current_phase_index();
        let phases = self.profile.phases();
        if idx >= phases.len() {
            return 0;
        }
        let start_of_phase: Duration = phases[..idx].iter().map(|p| p.duration).sum();
        let phase_elapsed = self.elapsed().saturating_sub(start_of_phase);
        phases[idx].target_actors(phase_elapsed)
    }

    /// RPS configured for the current phase, or 0 once complete or when the
    /// phase does not override the rate.
    pub fn current_rps(&self) -> u64 {
        let idx = self.current_phase_index();
        self.profile.phases().get(idx).and_then(|p| p.rps).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str, secs: u64, shape: PhaseShape) -> Phase {
        Phase { name: name.to_string(), duration: Duration::from_secs(secs), shape, rps: None }
    }

    #[tokio::test(start_paused = true)]
    async fn steady_phase_reports_fixed_target() {
        let clock = Clock::new_paused();
        clock.resume();
        let profile =
            LoadProfile::new(vec![phase("steady", 1, PhaseShape::Steady { actors: 5 })]);
        let pm = PhaseManager::new(profile, clock);
        assert_eq!(pm.target_actors(), 5);
        assert_eq!(pm.current_phase_index(), 0);
        assert!(!pm.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_phase_interpolates_and_is_monotonic() {
        let clock = Clock::new_paused();
        clock.resume();
        let profile = LoadProfile::new(vec![phase(
            "ramp",
            10,
            PhaseShape::Ramp { start: 1, end: 5 },
        )]);
        let pm = PhaseManager::new(profile, clock.clone());

        let mut last = pm.target_actors();
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let current = pm.target_actors();
            assert!(current >= last);
            last = current;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_yields_zero_target_and_rps() {
        let clock = Clock::new_paused();
        clock.resume();
        let profile =
            LoadProfile::new(vec![phase("steady", 1, PhaseShape::Steady { actors: 3 })]);
        let pm = PhaseManager::new(profile, clock);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(pm.is_complete());
        assert_eq!(pm.target_actors(), 0);
        assert_eq!(pm.current_rps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_tie_break_favors_next_phase() {
        let clock = Clock::new_paused();
        clock.resume();
        let profile = LoadProfile::new(vec![
            phase("a", 1, PhaseShape::Steady { actors: 1 }),
            phase("b", 1, PhaseShape::Steady { actors: 9 }),
        ]);
        let pm = PhaseManager::new(profile, clock);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(pm.current_phase_index(), 1);
        assert_eq!(pm.target_actors(), 9);
    }
}
