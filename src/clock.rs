//! Injectable source of the current instant.
//!
//! Every time-dependent decision in the scheduling engine reads `now` through
//! this trait instead of calling `Utc::now()` directly, so tests can pin time
//! and reproduce the literal scenarios exactly.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that always returns a fixed instant.
#[derive(Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let pinned = Utc.with_ymd_and_hms(2026, 2, 10, 15, 0, 0).unwrap();
        let clock = FixedClock(pinned);
        assert_eq!(clock.now(), pinned);
        assert_eq!(clock.now(), pinned);
    }
}
