use serde::Serialize;

use crate::ids::PassId;

/// Snapshot of the step cursor handed to pass callbacks and uniform binding.
///
/// A state is only ever replaced, never edited in place: the scheduler builds
/// the next snapshot with [`StepState::advanced`] and [`StepState::at_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepState {
    tick: i64,
    time: f64,
    dt: f64,
    pass: Option<PassId>,
}

impl StepState {
    /// A cursor that has not run yet: tick `-1`, no pass.
    pub fn idle(time: f64) -> Self {
        Self {
            tick: -1,
            time,
            dt: 0.0,
            pass: None,
        }
    }

    /// The next tick at `time`, before any of its passes run.
    pub fn advanced(&self, time: f64) -> Self {
        Self {
            tick: self.tick + 1,
            time,
            dt: time - self.time,
            pass: None,
        }
    }

    /// Same tick, with the time cursor moved to `time` and no delta.
    pub fn restarted(&self, time: f64) -> Self {
        Self {
            tick: self.tick,
            time,
            dt: 0.0,
            pass: None,
        }
    }

    pub fn at_pass(&self, pass: PassId) -> Self {
        Self {
            pass: Some(pass),
            ..*self
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn pass(&self) -> Option<PassId> {
        self.pass
    }

    pub fn is_idle(&self) -> bool {
        self.tick < 0
    }
}
