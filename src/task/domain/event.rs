//! Immutable entries in a task's event log.

use super::{TaskEventId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event kind appended when a task is created.
pub const CREATED_EVENT: &str = "created";
/// Event kind appended when task fields are updated.
pub const UPDATED_EVENT: &str = "updated";
/// Event kind appended on every accepted status transition.
pub const STATUS_CHANGED_EVENT: &str = "status_changed";

/// Record of a state change or action performed on a task.
///
/// The serialized form doubles as the APM export format, so field names
/// follow that format (`event_id`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "event_id")]
    id: TaskEventId,
    task_id: TaskId,
    #[serde(rename = "type")]
    kind: String,
    timestamp: DateTime<Utc>,
    actor: String,
    #[serde(default)]
    details: Map<String, Value>,
    #[serde(default)]
    correlation_id: Option<Uuid>,
}

impl TaskEvent {
    pub(super) fn new(
        task_id: TaskId,
        kind: impl Into<String>,
        actor: impl Into<String>,
        details: Map<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskEventId::new(),
            task_id,
            kind: kind.into(),
            timestamp,
            actor: actor.into(),
            details,
            correlation_id: None,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> TaskEventId {
        self.id
    }

    /// Returns the identifier of the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the free-form event kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns when the event was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns who performed the action.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Returns the event detail bag.
    #[must_use]
    pub const fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Returns the correlation identifier, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    /// Returns the event in APM export format.
    #[must_use]
    pub fn to_apm_format(&self) -> Value {
        let mut object = Map::new();
        object.insert("event_id".to_owned(), Value::from(self.id.to_string()));
        object.insert("task_id".to_owned(), Value::from(self.task_id.to_string()));
        object.insert("type".to_owned(), Value::from(self.kind.clone()));
        object.insert(
            "timestamp".to_owned(),
            Value::from(self.timestamp.to_rfc3339()),
        );
        object.insert("actor".to_owned(), Value::from(self.actor.clone()));
        object.insert("details".to_owned(), Value::Object(self.details.clone()));
        object.insert(
            "correlation_id".to_owned(),
            self.correlation_id
                .map_or(Value::Null, |id| Value::from(id.to_string())),
        );
        Value::Object(object)
    }
}
