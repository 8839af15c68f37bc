//! Shared helpers for integration tests.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Mutex, PoisonError};

/// Deterministic clock that advances by a fixed step on every read.
#[derive(Debug)]
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    /// Starts at 2024-01-01T09:00:00Z and advances one minute per read.
    #[must_use]
    pub fn minutes() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            now: Mutex::new(start),
            step: Duration::minutes(1),
        }
    }

    /// Returns the next instant without advancing.
    #[must_use]
    pub fn peek(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
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
