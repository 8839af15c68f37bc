//! Aggregate statistics over the stored tasks.

use crate::task::domain::{Priority, Task, TaskStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate counts and rates across every stored task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Number of tasks.
    pub total_tasks: usize,
    /// Non-zero counts keyed by status name.
    pub by_status: BTreeMap<String, usize>,
    /// Non-zero counts keyed by priority name.
    pub by_priority: BTreeMap<String, usize>,
    /// Counts keyed by assignee role; unassigned tasks are omitted.
    pub by_assignee: BTreeMap<String, usize>,
    /// Mean total duration in seconds of completed tasks with a known
    /// duration.
    pub average_duration: Option<f64>,
    /// Share of tasks in the `completed` status; `0.0` with no tasks.
    pub completion_rate: f64,
}

impl MetricsSummary {
    /// Computes the summary for `tasks`.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "task counts stay far below 2^52"
    )]
    #[expect(
        clippy::float_arithmetic,
        reason = "the average duration and completion rate are ratios"
    )]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let by_status = TaskStatus::ALL
            .iter()
            .map(|status| {
                let count = tasks.iter().filter(|task| task.status() == *status).count();
                (status.as_str().to_owned(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        let by_priority = Priority::ALL
            .iter()
            .map(|priority| {
                let count = tasks
                    .iter()
                    .filter(|task| task.priority() == *priority)
                    .count();
                (priority.as_str().to_owned(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        let mut by_assignee = BTreeMap::new();
        for role in tasks.iter().filter_map(Task::assignee) {
            *by_assignee.entry(role.as_str().to_owned()).or_insert(0) += 1;
        }

        let durations: Vec<f64> = tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Completed)
            .filter_map(|task| task.metrics().total_duration)
            .filter(|duration| *duration > 0.0)
            .collect();
        let average_duration = (!durations.is_empty())
            .then(|| durations.iter().sum::<f64>() / durations.len() as f64);

        let completed = tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Completed)
            .count();
        let completion_rate = if tasks.is_empty() {
            0.0
        } else {
            completed as f64 / tasks.len() as f64
        };

        Self {
            total_tasks: tasks.len(),
            by_status,
            by_priority,
            by_assignee,
            average_duration,
            completion_rate,
        }
    }
}
