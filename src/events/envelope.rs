//! Bus-level event envelope.

use crate::task::domain::Task;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Kinds of event published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventKind {
    /// A task was created.
    #[serde(rename = "task.created")]
    TaskCreated,
    /// A task's descriptive fields changed.
    #[serde(rename = "task.updated")]
    TaskUpdated,
    /// A task was removed from storage.
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    /// A task moved to another status.
    #[serde(rename = "task.status_changed")]
    TaskStatusChanged,
    /// A task was assigned to a role.
    #[serde(rename = "task.assigned")]
    TaskAssigned,
    /// A task completed.
    #[serde(rename = "task.completed")]
    TaskCompleted,
    /// A task failed.
    #[serde(rename = "task.failed")]
    TaskFailed,
    /// A task became blocked.
    #[serde(rename = "task.blocked")]
    TaskBlocked,
    /// A task was archived.
    #[serde(rename = "task.archived")]
    TaskArchived,
    /// A batch of tasks was created.
    #[serde(rename = "batch.created")]
    BatchCreated,
    /// A batch of tasks was updated.
    #[serde(rename = "batch.updated")]
    BatchUpdated,
    /// Story extraction started.
    #[serde(rename = "extraction.started")]
    ExtractionStarted,
    /// Story extraction finished.
    #[serde(rename = "extraction.completed")]
    ExtractionCompleted,
    /// A metrics summary was collected.
    #[serde(rename = "metrics.collected")]
    MetricsCollected,
}

impl EventKind {
    /// Returns the dotted wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task.created",
            Self::TaskUpdated => "task.updated",
            Self::TaskDeleted => "task.deleted",
            Self::TaskStatusChanged => "task.status_changed",
            Self::TaskAssigned => "task.assigned",
            Self::TaskCompleted => "task.completed",
            Self::TaskFailed => "task.failed",
            Self::TaskBlocked => "task.blocked",
            Self::TaskArchived => "task.archived",
            Self::BatchCreated => "batch.created",
            Self::BatchUpdated => "batch.updated",
            Self::ExtractionStarted => "extraction.started",
            Self::ExtractionCompleted => "extraction.completed",
            Self::MetricsCollected => "metrics.collected",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary data carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Snapshot of the task the event concerns.
    Task(Box<Task>),
    /// Free-form JSON data.
    Data(Value),
}

impl From<Task> for EventPayload {
    fn from(task: Task) -> Self {
        Self::Task(Box::new(task))
    }
}

impl From<Value> for EventPayload {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

/// Envelope delivered to subscribers and retained in the bus history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    timestamp: DateTime<Utc>,
    #[serde(rename = "data")]
    payload: EventPayload,
    metadata: Option<Map<String, Value>>,
    correlation_id: Option<Uuid>,
}

impl Event {
    pub(super) fn new(
        kind: EventKind,
        timestamp: DateTime<Utc>,
        payload: EventPayload,
        metadata: Option<Map<String, Value>>,
        correlation_id: Option<Uuid>,
    ) -> Self {
        Self {
            kind,
            timestamp,
            payload,
            metadata,
            correlation_id,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns when the event was emitted.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the event payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Returns the task carried by the payload, if any.
    #[must_use]
    pub fn task(&self) -> Option<&Task> {
        match &self.payload {
            EventPayload::Task(task) => Some(task),
            EventPayload::Data(_) => None,
        }
    }

    /// Returns the envelope metadata.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }
}
