//! Fixed-timestep scheduler
//!
//! Converts wall-clock time into a number of owed simulation steps. The
//! simulation is considered to be at `start + steps * timestep`; every full
//! timestep the wall clock is ahead of that is one owed step. When the clock
//! runs more than `max_drift` ahead (a stall, a backgrounded window) the step
//! counter jumps forward instead of replaying the whole gap.

use crate::error::ConfigError;
use std::time::Duration;

/// Position of the simulation on the wall-clock timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerState {
    /// Wall-clock time at which step 0 began
    pub start: Duration,
    /// Steps executed or deliberately skipped so far
    pub steps: u64,
}

impl SchedulerState {
    pub fn starting_at(start: Duration) -> Self {
        Self { start, steps: 0 }
    }

    /// Wall-clock time the simulation has caught up to
    pub fn expected(&self, timestep: Duration) -> Duration {
        self.start + scaled(timestep, self.steps)
    }
}

/// A catch-up correction: drift exceeded the ceiling and steps were skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingAnomaly {
    /// Drift observed before the correction
    pub drift: Duration,
    /// Steps counted without running them
    pub skipped_steps: u64,
}

/// Result of one scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    /// Compute steps the caller must run before rendering
    pub steps: u64,
    pub catch_up: Option<TimingAnomaly>,
    /// State after the catch-up jump and the owed steps are counted
    pub state: SchedulerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestepScheduler {
    timestep: Duration,
    max_drift: Duration,
}

impl TimestepScheduler {
    pub fn new(timestep: Duration, max_drift: Duration) -> Result<Self, ConfigError> {
        if timestep.is_zero() {
            return Err(ConfigError::NonPositiveTimestep(0.0));
        }
        Ok(Self {
            timestep,
            max_drift,
        })
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn max_drift(&self) -> Duration {
        self.max_drift
    }

    /// How many steps are owed at wall-clock `now`.
    ///
    /// Only whole timesteps are owed; the remainder stays as drift for the next
    /// call. A clock that is behind the simulation owes nothing.
    pub fn steps_owed(&self, now: Duration, state: SchedulerState) -> StepPlan {
        let mut state = state;
        let mut catch_up = None;
        let mut drift = now.checked_sub(state.expected(self.timestep));

        if let Some(observed) = drift.filter(|d| *d > self.max_drift) {
            let skipped_steps = div_ceil(observed, self.timestep);
            state.steps += skipped_steps;
            log::warn!(
                "Simulation drifted {:.1}ms behind wall clock, skipping {} steps",
                observed.as_secs_f64() * 1_000.0,
                skipped_steps
            );
            catch_up = Some(TimingAnomaly {
                drift: observed,
                skipped_steps,
            });
            // The jump is a ceiling, so this is never positive again.
            drift = now.checked_sub(state.expected(self.timestep));
        }

        let steps = drift.map_or(0, |d| div_floor(d, self.timestep));
        state.steps += steps;

        StepPlan {
            steps,
            catch_up,
            state,
        }
    }
}

fn scaled(timestep: Duration, steps: u64) -> Duration {
    let nanos = timestep.as_nanos() * steps as u128;
    Duration::new(
        (nanos / 1_000_000_000) as u64,
        (nanos % 1_000_000_000) as u32,
    )
}

fn div_floor(span: Duration, timestep: Duration) -> u64 {
    (span.as_nanos() / timestep.as_nanos()) as u64
}

fn div_ceil(span: Duration, timestep: Duration) -> u64 {
    span.as_nanos().div_ceil(timestep.as_nanos()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn scheduler(timestep_ms: u64, max_drift_ms: u64) -> TimestepScheduler {
        TimestepScheduler::new(ms(timestep_ms), ms(max_drift_ms)).unwrap()
    }

    #[test]
    fn rejects_zero_timestep() {
        assert!(TimestepScheduler::new(Duration::ZERO, ms(1000)).is_err());
    }

    #[test]
    fn first_tick_owes_whole_steps_and_keeps_residual() {
        let s = scheduler(16, 1000);
        let plan = s.steps_owed(ms(50), SchedulerState::starting_at(ms(0)));

        assert_eq!(plan.steps, 3);
        assert_eq!(plan.catch_up, None);
        assert_eq!(plan.state.steps, 3);
        assert_eq!(ms(50) - plan.state.expected(s.timestep()), ms(2));
    }

    #[test]
    fn clock_behind_simulation_owes_nothing() {
        let s = scheduler(16, 1000);
        let state = SchedulerState {
            start: ms(100),
            steps: 10,
        };

        let plan = s.steps_owed(ms(150), state);

        assert_eq!(plan.steps, 0);
        assert_eq!(plan.state, state);
    }

    #[test]
    fn repeated_call_in_same_interval_owes_nothing() {
        let s = scheduler(16, 1000);
        let first = s.steps_owed(ms(50), SchedulerState::default());
        let second = s.steps_owed(ms(50), first.state);

        assert_eq!(second.steps, 0);
        assert_eq!(second.state, first.state);
    }

    #[test]
    fn stall_triggers_catch_up_jump() {
        let s = scheduler(20, 1000);
        let plan = s.steps_owed(ms(5000), SchedulerState::starting_at(ms(0)));

        assert_eq!(
            plan.catch_up,
            Some(TimingAnomaly {
                drift: ms(5000),
                skipped_steps: 250,
            })
        );
        assert_eq!(plan.steps, 0);
        assert_eq!(plan.state.steps, 250);
    }

    #[test]
    fn catch_up_rounds_past_now_then_resumes() {
        let s = scheduler(20, 1000);
        let state = SchedulerState {
            start: ms(0),
            steps: 5,
        };

        let plan = s.steps_owed(ms(5010), state);
        // 4910ms of drift -> ceil(4910 / 20) = 246 skipped, landing at 5020ms.
        assert_eq!(plan.catch_up.map(|c| c.skipped_steps), Some(246));
        assert_eq!(plan.steps, 0);
        assert_eq!(plan.state.steps, 251);
        assert_eq!(plan.state.expected(s.timestep()), ms(5020));

        assert_eq!(s.steps_owed(ms(5030), plan.state).steps, 0);
        assert_eq!(s.steps_owed(ms(5040), plan.state).steps, 1);
    }

    #[test]
    fn drift_at_ceiling_is_not_corrected() {
        let s = scheduler(20, 1000);
        let plan = s.steps_owed(ms(1000), SchedulerState::default());

        assert_eq!(plan.catch_up, None);
        assert_eq!(plan.steps, 50);
    }

    #[test]
    fn residual_drift_after_correction_is_bounded() {
        for (timestep, max_drift) in [(7, 100), (16, 1000), (20, 1000), (33, 40), (1000, 10)] {
            let s = scheduler(timestep, max_drift);
            for now in [0, 1, 99, 101, 1_001, 4_999, 5_000, 12_345, 600_000] {
                let plan = s.steps_owed(ms(now), SchedulerState::default());
                let expected = plan.state.expected(s.timestep());
                let residual = ms(now).saturating_sub(expected);
                assert!(
                    residual <= s.max_drift() + s.timestep(),
                    "dt={timestep} max={max_drift} now={now}: residual {residual:?}"
                );
                assert!(residual < s.timestep());
            }
        }
    }

    #[test]
    fn step_count_is_monotonic_for_non_decreasing_time() {
        let s = scheduler(16, 250);
        let mut state = SchedulerState::starting_at(ms(3));
        let mut last_steps = 0;
        let mut now = ms(3);

        // Irregular frame intervals with the occasional stall.
        let gaps = [0, 1, 16, 17, 5, 33, 900, 0, 2, 3_000, 16, 15, 250, 251, 8];
        for round in 0..20 {
            for gap in gaps {
                now += ms(gap + round);
                let plan = s.steps_owed(now, state);
                assert!(plan.state.steps >= last_steps);
                assert_eq!(
                    plan.state.steps,
                    state.steps + plan.steps + plan.catch_up.map_or(0, |c| c.skipped_steps)
                );
                last_steps = plan.state.steps;
                state = plan.state;
            }
        }
    }
}
