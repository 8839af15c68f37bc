//! Request payloads for task creation.

use crate::task::domain::{AgentRole, EpicId, Priority, StoryId, TaskDetails};
use serde_json::{Map, Value};

/// Request payload for creating a task.
///
/// Priority defaults to [`Priority::Medium`]; labels and metadata start empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateTaskRequest {
    details: TaskDetails,
}

impl CreateTaskRequest {
    /// Creates a request with the required title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            details: TaskDetails::new(title),
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.details.description = description.into();
        self
    }

    /// Sets the task priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.details.priority = priority;
        self
    }

    /// Assigns the task to a role.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: AgentRole) -> Self {
        self.details.assignee = Some(assignee);
        self
    }

    /// Sets the story correlation identifier.
    #[must_use]
    pub const fn with_story_id(mut self, story_id: StoryId) -> Self {
        self.details.story_id = Some(story_id);
        self
    }

    /// Sets the epic correlation identifier.
    #[must_use]
    pub const fn with_epic_id(mut self, epic_id: EpicId) -> Self {
        self.details.epic_id = Some(epic_id);
        self
    }

    /// Sets the task labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.details.labels = labels.into_iter().collect();
        self
    }

    /// Sets the task metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.details.metadata = metadata;
        self
    }

    /// Returns the requested priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.details.priority
    }

    /// Returns the requested assignee.
    #[must_use]
    pub const fn assignee(&self) -> Option<AgentRole> {
        self.details.assignee
    }

    pub(super) fn into_details(self) -> TaskDetails {
        self.details
    }
}
