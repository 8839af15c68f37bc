//! Task query filters.

use crate::task::domain::{AgentRole, Priority, StoryId, Task, TaskStatus};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

/// Filters applied by [`TaskService::query_tasks`](super::TaskService::query_tasks).
///
/// Every set filter must match. The label filter matches tasks carrying any
/// of the requested labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    status: Option<TaskStatus>,
    assignee: Option<AgentRole>,
    priority: Option<Priority>,
    story_id: Option<StoryId>,
    labels: Vec<String>,
    created_after: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl TaskQuery {
    /// Creates a query matching every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to one status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts results to one assignee.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: AgentRole) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Restricts results to one priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restricts results to one story.
    #[must_use]
    pub const fn with_story_id(mut self, story_id: StoryId) -> Self {
        self.story_id = Some(story_id);
        self
    }

    /// Restricts results to tasks carrying at least one of `labels`.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Restricts results to tasks created at or after `instant`.
    #[must_use]
    pub const fn with_created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    /// Caps the number of returned tasks.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns whether any field filter (status, assignee, priority, story or
    /// labels) is set.
    #[must_use]
    pub const fn has_filters(&self) -> bool {
        self.status.is_some()
            || self.assignee.is_some()
            || self.priority.is_some()
            || self.story_id.is_some()
            || !self.labels.is_empty()
    }

    /// Returns whether `task` satisfies every filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self
                .assignee
                .is_none_or(|assignee| task.assignee() == Some(assignee))
            && self.priority.is_none_or(|priority| task.priority() == priority)
            && self
                .story_id
                .is_none_or(|story_id| task.story_id() == Some(story_id))
            && (self.labels.is_empty() || task.has_any_label(&self.labels))
            && self
                .created_after
                .is_none_or(|instant| task.created_at() >= instant)
    }

    /// Filters, orders and truncates `tasks`.
    ///
    /// Higher priority comes first; ties are broken by earlier creation.
    #[must_use]
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        let mut selected: Vec<Task> = tasks.into_iter().filter(|task| self.matches(task)).collect();
        selected.sort_by_key(|task| (Reverse(task.priority().weight()), task.created_at()));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}
