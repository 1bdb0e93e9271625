use std::time::Instant;

/// Source of the external time handed to [`crate::StepScheduler::advance`].
pub trait Clock {
    /// Seconds since some fixed origin.
    fn now(&mut self) -> f64;
}

/// Monotonic clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to; for dry runs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    time: f64,
}

impl ManualClock {
    pub fn new(time: f64) -> Self {
        Self { time }
    }

    pub fn set(&mut self, time: f64) {
        self.time = time;
    }

    pub fn advance_by(&mut self, seconds: f64) {
        self.time += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> f64 {
        self.time
    }
}
