//! Flat storage representation shared by the file and table adapters.

use crate::task::{
    domain::{
        AgentRole, EpicId, PersistedTaskData, Priority, StoryId, Task, TaskDetails, TaskEvent,
        TaskId, TaskMetrics, TaskStatus,
    },
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::str::FromStr;

/// Events kept by the generic export format.
pub const EXPORT_EVENT_WINDOW: usize = 10;

/// Serialized task with string-encoded identifiers, enums and timestamps.
///
/// Only the trailing `event_window` events survive encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    /// Task identifier.
    pub id: String,
    /// Task title.
    #[serde(default)]
    pub title: String,
    /// Task description.
    #[serde(default)]
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// Priority level.
    pub priority: String,
    /// Story correlation identifier.
    #[serde(default)]
    pub story_id: Option<String>,
    /// Epic correlation identifier.
    #[serde(default)]
    pub epic_id: Option<String>,
    /// Assigned role.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Metadata bag.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 modification timestamp.
    pub updated_at: String,
    /// RFC 3339 start timestamp.
    #[serde(default)]
    pub started_at: Option<String>,
    /// RFC 3339 completion timestamp.
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Populated metrics.
    #[serde(default)]
    pub metrics: TaskMetrics,
    /// Trailing window of events.
    #[serde(default)]
    pub events: Vec<TaskEvent>,
}

impl TaskDocument {
    /// Encodes a task, keeping only the last `event_window` events.
    #[must_use]
    pub fn from_task(task: &Task, event_window: usize) -> Self {
        let events = task.events();
        let retained = events
            .get(events.len().saturating_sub(event_window)..)
            .unwrap_or_default();
        Self {
            id: task.id().to_string(),
            title: task.title().to_owned(),
            description: task.description().to_owned(),
            status: task.status().as_str().to_owned(),
            priority: task.priority().as_str().to_owned(),
            story_id: task.story_id().map(|id| id.to_string()),
            epic_id: task.epic_id().map(|id| id.to_string()),
            assignee: task.assignee().map(|role| role.as_str().to_owned()),
            labels: task.labels().to_vec(),
            metadata: task.metadata().clone(),
            created_at: task.created_at().to_rfc3339(),
            updated_at: task.updated_at().to_rfc3339(),
            started_at: task.started_at().map(|at| at.to_rfc3339()),
            completed_at: task.completed_at().map(|at| at.to_rfc3339()),
            metrics: task.metrics().clone(),
            events: retained.to_vec(),
        }
    }

    /// Decodes the document back into a task aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::CorruptRecord`] when any identifier,
    /// enum or timestamp field cannot be parsed.
    pub fn into_task(self) -> TaskRepositoryResult<Task> {
        let record_id = self.id.clone();
        let corrupt = |reason: String| TaskRepositoryError::CorruptRecord {
            id: record_id.clone(),
            reason,
        };

        let id = parse_field::<TaskId>("id", &self.id).map_err(&corrupt)?;
        let status = TaskStatus::try_from(self.status.as_str())
            .map_err(|err| corrupt(err.to_string()))?;
        let priority = Priority::try_from(self.priority.as_str())
            .map_err(|err| corrupt(err.to_string()))?;
        let assignee = self
            .assignee
            .as_deref()
            .map(AgentRole::try_from)
            .transpose()
            .map_err(|err| corrupt(err.to_string()))?;
        let story_id = parse_optional::<StoryId>("story_id", self.story_id.as_deref())
            .map_err(&corrupt)?;
        let epic_id =
            parse_optional::<EpicId>("epic_id", self.epic_id.as_deref()).map_err(&corrupt)?;
        let created_at = parse_timestamp("created_at", &self.created_at).map_err(&corrupt)?;
        let updated_at = parse_timestamp("updated_at", &self.updated_at).map_err(&corrupt)?;
        let started_at = self
            .started_at
            .as_deref()
            .map(|raw| parse_timestamp("started_at", raw))
            .transpose()
            .map_err(&corrupt)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_timestamp("completed_at", raw))
            .transpose()
            .map_err(&corrupt)?;

        let details = TaskDetails {
            title: self.title,
            description: self.description,
            priority,
            assignee,
            story_id,
            epic_id,
            labels: self.labels,
            metadata: self.metadata,
        };
        Ok(Task::from_persisted(PersistedTaskData {
            id,
            details,
            status,
            created_at,
            updated_at,
            started_at,
            completed_at,
            metrics: self.metrics,
            events: self.events,
        }))
    }
}

fn parse_field<T>(field: &str, raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|err| format!("invalid {field} '{raw}': {err}"))
}

fn parse_optional<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    raw.filter(|value| !value.is_empty())
        .map(|value| parse_field(field, value))
        .transpose()
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| format!("invalid {field} '{raw}': {err}"))
}
