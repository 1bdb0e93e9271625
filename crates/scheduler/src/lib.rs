//! Drives a simulation one tick at a time.
//!
//! Each [`StepScheduler::advance`] bumps the tick counter, moves the time
//! cursor according to the [`Timing`] policy, then visits every pass in
//! ascending order. Passes run strictly in order because a later pass may read
//! what an earlier one wrote during the same tick.

mod clock;

use simconfig::{SimConfig, TimingMode};

pub use clock::{Clock, ManualClock, SystemClock};
pub use gpgpu::{PassId, StepState};

/// Time added per tick under [`Timing::Tick`].
pub const NOMINAL_TICK: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("fixed-step timing requires a fixed_step")]
    MissingFixedStep,
    #[error("fixed step must be positive and finite; got {0}")]
    InvalidFixedStep(f64),
}

/// How `time` moves between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timing {
    /// `time` counts ticks.
    Tick,
    /// `time` is whatever the host clock says.
    WallClock,
    /// `time` grows by a constant amount per tick, whatever the clock says.
    FixedStep(f64),
}

impl Timing {
    pub fn from_config(config: &SimConfig) -> Result<Self, SchedulerError> {
        match config.timing {
            TimingMode::Tick => Ok(Timing::Tick),
            TimingMode::Wall => Ok(Timing::WallClock),
            TimingMode::Fixed => {
                let step = config
                    .fixed_step_secs()
                    .ok_or(SchedulerError::MissingFixedStep)?;
                Timing::fixed(step)
            }
        }
    }

    pub fn fixed(step: f64) -> Result<Self, SchedulerError> {
        if step.is_finite() && step > 0.0 {
            Ok(Timing::FixedStep(step))
        } else {
            Err(SchedulerError::InvalidFixedStep(step))
        }
    }

    /// Where the time cursor starts: 0 when counting ticks, otherwise `now`.
    pub fn start_time(self, now: f64) -> f64 {
        match self {
            Timing::Tick => 0.0,
            Timing::WallClock | Timing::FixedStep(_) => now,
        }
    }

    fn next_time(self, previous: f64, now: f64) -> f64 {
        match self {
            Timing::Tick => previous + NOMINAL_TICK,
            Timing::WallClock => now,
            Timing::FixedStep(step) => previous + step,
        }
    }
}

/// Owns the step cursor of one simulation instance.
#[derive(Debug, Clone)]
pub struct StepScheduler {
    state: StepState,
    timing: Timing,
    passes: usize,
}

impl StepScheduler {
    /// A scheduler for `passes` passes, starting at time 0.
    pub fn new(passes: usize, timing: Timing) -> Self {
        Self::with_start_time(passes, timing, 0.0)
    }

    /// Starts the time cursor at `timing.start_time(now)`.
    pub fn with_start_time(passes: usize, timing: Timing, now: f64) -> Self {
        Self {
            state: StepState::idle(timing.start_time(now)),
            timing,
            passes,
        }
    }

    /// Builds the configured timing policy, starting the cursor from `now`.
    pub fn from_config(
        config: &SimConfig,
        passes: usize,
        now: f64,
    ) -> Result<Self, SchedulerError> {
        Ok(Self::with_start_time(
            passes,
            Timing::from_config(config)?,
            now,
        ))
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Switches policy and restarts the time cursor; the tick count is kept.
    pub fn set_timing(&mut self, timing: Timing, now: f64) {
        let time = timing.start_time(now);
        self.timing = timing;
        self.state = self.state.restarted(time);
        tracing::debug!(?timing, time, "timing policy changed");
    }

    /// Runs one tick at external time `now`, calling `on_pass` once per pass.
    ///
    /// The returned state is the finished tick, outside of any pass.
    ///
    /// `now` is only consulted under [`Timing::WallClock`].
    pub fn advance<F>(&mut self, now: f64, mut on_pass: F) -> StepState
    where
        F: FnMut(&StepState),
    {
        let time = self.timing.next_time(self.state.time(), now);
        let state = self.state.advanced(time);
        tracing::trace!(
            tick = state.tick(),
            time = state.time(),
            dt = state.dt(),
            "advancing simulation"
        );

        for pass in 0..self.passes {
            self.state = state.at_pass(PassId(pass));
            on_pass(&self.state);
        }
        self.state = state;
        state
    }

    pub fn advance_with<C, F>(&mut self, clock: &mut C, on_pass: F) -> StepState
    where
        C: Clock + ?Sized,
        F: FnMut(&StepState),
    {
        let now = clock.now();
        self.advance(now, on_pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
version = 1
timing = "fixed"
fixed_step = "250ms"

[[values]]
name = "position"
channels = 4
"#;

    #[test]
    fn ticks_start_from_zero() {
        let mut scheduler = StepScheduler::new(1, Timing::Tick);
        assert!(scheduler.state().is_idle());
        let ticks: Vec<_> = (0..3)
            .map(|_| scheduler.advance(100.0, |_| {}).tick())
            .collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(scheduler.state().time(), 3.0);
    }

    #[test]
    fn fixed_step_ignores_the_clock() {
        let mut scheduler = StepScheduler::new(2, Timing::fixed(1.0).unwrap());
        let states: Vec<_> = [5.0, 5.0, 42.0]
            .into_iter()
            .map(|now| scheduler.advance(now, |_| {}))
            .collect();
        let times: Vec<_> = states.iter().map(|state| state.time()).collect();
        let dts: Vec<_> = states.iter().map(|state| state.dt()).collect();
        let ticks: Vec<_> = states.iter().map(|state| state.tick()).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(dts, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn wall_clock_follows_the_host() {
        let mut clock = ManualClock::new(10.0);
        let mut scheduler = StepScheduler::with_start_time(1, Timing::WallClock, clock.now());
        clock.advance_by(0.5);
        let first = scheduler.advance_with(&mut clock, |_| {});
        assert_eq!(first.time(), 10.5);
        assert_eq!(first.dt(), 0.5);
        clock.advance_by(2.0);
        let second = scheduler.advance_with(&mut clock, |_| {});
        assert_eq!(second.tick(), 1);
        assert_eq!(second.dt(), 2.0);
    }

    #[test]
    fn passes_run_in_order_with_the_current_state() {
        let mut scheduler = StepScheduler::new(3, Timing::Tick);
        let mut seen = Vec::new();
        scheduler.advance(0.0, |state| seen.push((state.tick(), state.pass())));
        scheduler.advance(0.0, |state| seen.push((state.tick(), state.pass())));
        assert_eq!(
            seen,
            vec![
                (0, Some(PassId(0))),
                (0, Some(PassId(1))),
                (0, Some(PassId(2))),
                (1, Some(PassId(0))),
                (1, Some(PassId(1))),
                (1, Some(PassId(2))),
            ]
        );
    }

    #[test]
    fn changing_timing_restarts_time() {
        let mut scheduler = StepScheduler::new(1, Timing::Tick);
        scheduler.advance(0.0, |_| {});
        scheduler.set_timing(Timing::WallClock, 7.0);
        assert_eq!(scheduler.state().time(), 7.0);
        assert_eq!(scheduler.state().tick(), 0);
        let state = scheduler.advance(7.25, |_| {});
        assert_eq!(state.tick(), 1);
        assert_eq!(state.dt(), 0.25);
    }

    #[test]
    fn builds_from_config() {
        let config = SimConfig::from_toml_str(CONFIG).unwrap();
        let scheduler = StepScheduler::from_config(&config, 1, 0.0).unwrap();
        assert_eq!(scheduler.timing(), Timing::FixedStep(0.25));
        assert!(matches!(
            Timing::fixed(0.0),
            Err(SchedulerError::InvalidFixedStep(_))
        ));
    }

    #[test]
    fn wall_clock_from_config_starts_at_the_host_time() {
        let config = SimConfig::from_toml_str(&CONFIG.replace(
            "timing = \"fixed\"\nfixed_step = \"250ms\"",
            "timing = \"wall\"",
        ))
        .unwrap();
        let mut clock = ManualClock::new(120.0);
        let mut scheduler = StepScheduler::from_config(&config, 1, clock.now()).unwrap();
        assert_eq!(scheduler.timing(), Timing::WallClock);
        clock.advance_by(0.5);
        let first = scheduler.advance_with(&mut clock, |_| {});
        assert_eq!(first.time(), 120.5);
        assert_eq!(first.dt(), 0.5);
    }
}
