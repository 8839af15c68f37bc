//! Unit tests for the task bounded context.

mod domain_tests;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Mutex, PoisonError};

/// Clock returning a fixed instant that advances by `step` on every read.
#[derive(Debug)]
pub(super) struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub(super) fn starting_at(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub(super) fn minutes() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .expect("valid start instant");
        Self::starting_at(start, Duration::minutes(1))
    }

    pub(super) fn peek(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *now;
        *now += self.step;
        current
    }
}
