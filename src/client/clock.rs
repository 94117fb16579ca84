use std::{
    fmt,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Monotonic time source for the transfer statistics.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
/// With a non-zero `step` every reading advances it by that amount afterwards.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::stepping(Duration::ZERO)
    }

    pub fn stepping(step: Duration) -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut offset = self.offset.lock();
        let now = self.start + *offset;
        *offset += self.step;
        now
    }
}
