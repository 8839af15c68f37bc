//! Per-task progress metrics derived from lifecycle timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Derived counters and durations owned by a single task.
///
/// Durations are expressed in seconds. All fields are mutated exclusively by
/// [`super::Task::transition_to`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMetrics {
    /// Seconds between creation and the first entry into `in_progress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_start: Option<f64>,
    /// Seconds between starting work and reaching an outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_progress: Option<f64>,
    /// Seconds between creation and reaching an outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    /// Number of accepted status transitions.
    #[serde(skip_serializing_if = "is_zero")]
    pub state_changes: u32,
    /// Number of times the task entered `blocked`.
    #[serde(skip_serializing_if = "is_zero")]
    pub blocks_encountered: u32,
    /// Number of times work restarted after a failure.
    #[serde(skip_serializing_if = "is_zero")]
    pub retry_count: u32,
}

impl TaskMetrics {
    /// Returns the populated metrics as a JSON object, omitting unset
    /// durations and zero counters.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let durations = [
            ("time_to_start", self.time_to_start),
            ("time_in_progress", self.time_in_progress),
            ("total_duration", self.total_duration),
        ];
        for (key, value) in durations {
            if let Some(seconds) = value {
                map.insert(key.to_owned(), Value::from(seconds));
            }
        }
        let counters = [
            ("state_changes", self.state_changes),
            ("blocks_encountered", self.blocks_encountered),
            ("retry_count", self.retry_count),
        ];
        for (key, value) in counters {
            if value != 0 {
                map.insert(key.to_owned(), Value::from(value));
            }
        }
        map
    }
}

#[expect(
    clippy::trivially_copy_pass_by_ref,
    reason = "serde skip_serializing_if passes fields by reference"
)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Returns the elapsed seconds between two instants, clamped at zero.
pub(super) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).to_std().map_or(0.0, |elapsed| elapsed.as_secs_f64())
}
