//! Injectable clock.
//!
//! Derived features depend on the current year; passing the clock in keeps
//! the feature builder deterministic under test.

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar year.
    fn current_year(&self) -> i32 {
        self.now().year()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Clock fixed at midnight on 1 January of `year`.
    pub fn at_year(year: i32) -> Self {
        let at = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
