//! Diesel row model for task persistence.

use super::schema::tasks;
use crate::task::{
    adapters::record::TaskDocument,
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use diesel::prelude::*;

/// Row stored in the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaskRow {
    /// Task identifier.
    pub id: String,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Priority level.
    pub priority: String,
    /// Story correlation identifier.
    pub story_id: Option<String>,
    /// Epic correlation identifier.
    pub epic_id: Option<String>,
    /// Assigned role.
    pub assignee: Option<String>,
    /// JSON-encoded labels.
    pub labels: String,
    /// JSON-encoded metadata.
    pub metadata: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Modification timestamp.
    pub updated_at: String,
    /// Start timestamp.
    pub started_at: Option<String>,
    /// Completion timestamp.
    pub completed_at: Option<String>,
    /// JSON-encoded metrics.
    pub metrics: String,
    /// JSON-encoded trailing event window.
    pub events: String,
}

impl TaskRow {
    /// Encodes a storage document into a table row.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when a JSON column cannot
    /// be encoded.
    pub fn from_document(document: TaskDocument) -> TaskRepositoryResult<Self> {
        let encode = |value: serde_json::Result<String>| {
            value.map_err(TaskRepositoryError::persistence)
        };
        Ok(Self {
            labels: encode(serde_json::to_string(&document.labels))?,
            metadata: encode(serde_json::to_string(&document.metadata))?,
            metrics: encode(serde_json::to_string(&document.metrics))?,
            events: encode(serde_json::to_string(&document.events))?,
            id: document.id,
            title: document.title,
            description: Some(document.description),
            status: document.status,
            priority: document.priority,
            story_id: document.story_id,
            epic_id: document.epic_id,
            assignee: document.assignee,
            created_at: document.created_at,
            updated_at: document.updated_at,
            started_at: document.started_at,
            completed_at: document.completed_at,
        })
    }

    /// Decodes the row's JSON columns into a storage document.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::CorruptRecord`] when a JSON column does
    /// not hold the expected shape.
    pub fn into_document(self) -> TaskRepositoryResult<TaskDocument> {
        let id = self.id;
        let corrupt = |column: &str, err: &serde_json::Error| TaskRepositoryError::CorruptRecord {
            id: id.clone(),
            reason: format!("invalid {column} column: {err}"),
        };
        let labels = serde_json::from_str(&self.labels).map_err(|err| corrupt("labels", &err))?;
        let metadata =
            serde_json::from_str(&self.metadata).map_err(|err| corrupt("metadata", &err))?;
        let metrics = serde_json::from_str(&self.metrics).map_err(|err| corrupt("metrics", &err))?;
        let events = serde_json::from_str(&self.events).map_err(|err| corrupt("events", &err))?;
        Ok(TaskDocument {
            id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            status: self.status,
            priority: self.priority,
            story_id: self.story_id,
            epic_id: self.epic_id,
            assignee: self.assignee,
            labels,
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            metrics,
            events,
        })
    }
}
