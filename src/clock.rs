use chrono::{Local, NaiveDateTime};

/// Source of "now" for past-date checks and slot expiry.
///
/// Bookings carry plain local date-times, so the clock does too.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: NaiveDateTime,
}

impl FixedClock {
    pub const fn new(time: NaiveDateTime) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.time
    }
}
