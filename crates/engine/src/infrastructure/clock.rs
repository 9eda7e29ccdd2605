//! Clock implementations.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use realmhub_domain::Timestamp;

use crate::infrastructure::ports::ClockPort;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out strictly increasing microsecond timestamps.
///
/// Wall-clock readings that fail to move forward (same microsecond, or a
/// clock stepped backwards) are bumped to one microsecond past the last
/// value issued.
pub struct MonotonicClock {
    clock: Arc<dyn ClockPort>,
    last: Mutex<Timestamp>,
}

impl MonotonicClock {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            last: Mutex::new(Timestamp::EPOCH),
        }
    }

    /// Raise the floor so future ticks land after `seen`.
    pub fn observe(&self, seen: Timestamp) {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if seen > *last {
            *last = seen;
        }
    }

    pub fn tick(&self) -> Timestamp {
        let now = Timestamp::from_datetime(self.clock.now());
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let next = if now > *last { now } else { last.next_tick() };
        *last = next;
        next
    }

    /// The underlying wall clock, without the monotonic adjustment.
    pub fn wall(&self) -> &Arc<dyn ClockPort> {
        &self.clock
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
