//! Task aggregate root and related lifecycle types.

use super::{
    AgentRole, EpicId, Priority, StoryId, TaskDomainError, TaskEvent, TaskId, TaskMetrics,
    TaskStatus,
    event::{CREATED_EVENT, STATUS_CHANGED_EVENT, UPDATED_EVENT},
    metrics::seconds_between,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Descriptive fields supplied when a task is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDetails {
    /// Short task title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Task priority.
    pub priority: Priority,
    /// Role the task is assigned to, if any.
    pub assignee: Option<AgentRole>,
    /// Story the task belongs to, if any.
    pub story_id: Option<StoryId>,
    /// Epic the task belongs to, if any.
    pub epic_id: Option<EpicId>,
    /// Free-text labels.
    pub labels: Vec<String>,
    /// Open key-value metadata.
    pub metadata: Map<String, Value>,
}

impl TaskDetails {
    /// Creates details with the given title and defaults elsewhere.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: String,
    status: TaskStatus,
    priority: Priority,
    story_id: Option<StoryId>,
    epic_id: Option<EpicId>,
    assignee: Option<AgentRole>,
    labels: Vec<String>,
    metadata: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    metrics: TaskMetrics,
    events: Vec<TaskEvent>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted descriptive fields.
    pub details: TaskDetails,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted metrics.
    pub metrics: TaskMetrics,
    /// Persisted trailing window of events.
    pub events: Vec<TaskEvent>,
}

/// Field changes requested for an existing task.
///
/// Only fields set to `Some` are considered. `assignee: Some(None)` clears the
/// assignee. Metadata entries are merged into the existing bag key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement priority.
    pub priority: Option<Priority>,
    /// Replacement assignee.
    pub assignee: Option<Option<AgentRole>>,
    /// Replacement label list.
    pub labels: Option<Vec<String>>,
    /// Metadata entries to merge.
    pub metadata: Option<Map<String, Value>>,
}

impl TaskUpdate {
    /// Parses an update from a loosely typed JSON object.
    ///
    /// Recognised keys are `title`, `description`, `priority`, `assignee`
    /// (`null` clears it), `labels` and `metadata`; other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when a priority or assignee value does not
    /// name a known variant, or when a field has the wrong JSON type.
    pub fn from_json(updates: &Map<String, Value>) -> Result<Self, TaskDomainError> {
        let mut update = Self::default();
        if let Some(title) = updates.get("title") {
            update.title = Some(expect_string("title", title)?);
        }
        if let Some(description) = updates.get("description") {
            update.description = Some(expect_string("description", description)?);
        }
        if let Some(priority) = updates.get("priority") {
            let raw = expect_string("priority", priority)?;
            update.priority = Some(Priority::try_from(raw.as_str())?);
        }
        if let Some(assignee) = updates.get("assignee") {
            update.assignee = Some(match assignee {
                Value::Null => None,
                other => {
                    let raw = expect_string("assignee", other)?;
                    Some(AgentRole::try_from(raw.as_str())?)
                }
            });
        }
        if let Some(labels) = updates.get("labels") {
            update.labels = Some(expect_string_list("labels", labels)?);
        }
        if let Some(metadata) = updates.get("metadata") {
            let Value::Object(entries) = metadata else {
                return Err(TaskDomainError::MetadataNotAnObject);
            };
            update.metadata = Some(entries.clone());
        }
        Ok(update)
    }

    /// Returns whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
            && self.metadata.is_none()
    }
}

fn expect_string(field: &'static str, value: &Value) -> Result<String, TaskDomainError> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or(TaskDomainError::InvalidUpdateField {
            field,
            expected: "string",
        })
}

fn expect_string_list(field: &'static str, value: &Value) -> Result<Vec<String>, TaskDomainError> {
    let invalid = TaskDomainError::InvalidUpdateField {
        field,
        expected: "array of strings",
    };
    let Value::Array(items) = value else {
        return Err(invalid);
    };
    items
        .iter()
        .map(|item| item.as_str().map(ToOwned::to_owned).ok_or_else(|| invalid.clone()))
        .collect()
}

impl Task {
    /// Creates a new pending task and records its `created` event.
    #[must_use]
    pub fn new(details: TaskDetails, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let mut task = Self {
            id: TaskId::new(),
            title: details.title,
            description: details.description,
            status: TaskStatus::Pending,
            priority: details.priority,
            story_id: details.story_id,
            epic_id: details.epic_id,
            assignee: details.assignee,
            labels: details.labels,
            metadata: details.metadata,
            created_at: timestamp,
            updated_at: timestamp,
            started_at: None,
            completed_at: None,
            metrics: TaskMetrics::default(),
            events: Vec::new(),
        };
        let created = event_details(json!({
            "priority": task.priority.as_str(),
            "assignee": task.assignee.map(AgentRole::as_str),
        }));
        task.add_event(CREATED_EVENT, "system", created, clock);
        task
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        let PersistedTaskData {
            id,
            details,
            status,
            created_at,
            updated_at,
            started_at,
            completed_at,
            metrics,
            events,
        } = data;
        Self {
            id,
            title: details.title,
            description: details.description,
            status,
            priority: details.priority,
            story_id: details.story_id,
            epic_id: details.epic_id,
            assignee: details.assignee,
            labels: details.labels,
            metadata: details.metadata,
            created_at,
            updated_at,
            started_at,
            completed_at,
            metrics,
            events,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the task priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the story correlation identifier.
    #[must_use]
    pub const fn story_id(&self) -> Option<StoryId> {
        self.story_id
    }

    /// Returns the epic correlation identifier.
    #[must_use]
    pub const fn epic_id(&self) -> Option<EpicId> {
        self.epic_id
    }

    /// Returns the assigned role.
    #[must_use]
    pub const fn assignee(&self) -> Option<AgentRole> {
        self.assignee
    }

    /// Returns the labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the metadata bag.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when work first started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the task last reached an outcome.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the derived metrics.
    #[must_use]
    pub const fn metrics(&self) -> &TaskMetrics {
        &self.metrics
    }

    /// Returns the event log in append order.
    #[must_use]
    pub fn events(&self) -> &[TaskEvent] {
        &self.events
    }

    /// Returns whether the task carries any of the given labels.
    #[must_use]
    pub fn has_any_label(&self, labels: &[String]) -> bool {
        labels.iter().any(|label| self.labels.contains(label))
    }

    /// Appends an event to the task history and returns it.
    pub fn add_event(
        &mut self,
        kind: impl Into<String>,
        actor: impl Into<String>,
        details: Map<String, Value>,
        clock: &impl Clock,
    ) -> TaskEvent {
        let event = TaskEvent::new(self.id, kind, actor, details, clock.utc());
        self.events.push(event.clone());
        event
    }

    /// Moves the task to `new_status` when the status policy allows it.
    ///
    /// Returns `false` without touching the task when the transition is not
    /// permitted. On success the lifecycle timestamps and metrics are updated
    /// and a `status_changed` event is appended.
    pub fn transition_to(
        &mut self,
        new_status: TaskStatus,
        actor: &str,
        clock: &impl Clock,
    ) -> bool {
        if !self.status.can_transition_to(new_status) {
            return false;
        }

        let old_status = self.status;
        let now = clock.utc();
        self.status = new_status;
        self.updated_at = now;

        if new_status == TaskStatus::InProgress {
            if old_status == TaskStatus::Failed {
                self.metrics.retry_count += 1;
            }
            if self.started_at.is_none() {
                self.started_at = Some(now);
                self.metrics.time_to_start = Some(seconds_between(self.created_at, now));
            }
        } else if new_status.is_outcome() {
            self.completed_at = Some(now);
            self.metrics.time_in_progress = self
                .started_at
                .map(|started_at| seconds_between(started_at, now));
            self.metrics.total_duration = Some(seconds_between(self.created_at, now));
        }

        self.metrics.state_changes += 1;
        if new_status == TaskStatus::Blocked {
            self.metrics.blocks_encountered += 1;
        }

        let details = event_details(json!({
            "from": old_status.as_str(),
            "to": new_status.as_str(),
        }));
        self.add_event(STATUS_CHANGED_EVENT, actor, details, clock);
        true
    }

    /// Applies the fields of `update` that differ from the current values.
    ///
    /// Returns the change set keyed by field name. When nothing changed the
    /// returned map is empty and the task is left untouched; otherwise
    /// `updated_at` is bumped and an `updated` event carrying the change set
    /// is appended.
    pub fn apply_update(
        &mut self,
        update: TaskUpdate,
        actor: &str,
        clock: &impl Clock,
    ) -> Map<String, Value> {
        let mut changes = Map::new();

        if let Some(title) = update.title.filter(|title| *title != self.title) {
            changes.insert(
                "title".to_owned(),
                json!({ "from": self.title, "to": title }),
            );
            self.title = title;
        }
        if let Some(description) = update
            .description
            .filter(|description| *description != self.description)
        {
            changes.insert("description".to_owned(), json!({ "updated": true }));
            self.description = description;
        }
        if let Some(priority) = update.priority.filter(|priority| *priority != self.priority) {
            changes.insert(
                "priority".to_owned(),
                json!({ "from": self.priority.as_str(), "to": priority.as_str() }),
            );
            self.priority = priority;
        }
        if let Some(assignee) = update.assignee.filter(|assignee| *assignee != self.assignee) {
            changes.insert(
                "assignee".to_owned(),
                json!({
                    "from": self.assignee.map(AgentRole::as_str),
                    "to": assignee.map(AgentRole::as_str),
                }),
            );
            self.assignee = assignee;
        }
        if let Some(labels) = update.labels.filter(|labels| *labels != self.labels) {
            changes.insert("labels".to_owned(), json!({ "updated": true }));
            self.labels = labels;
        }
        if let Some(entries) = update.metadata {
            let mut merged = self.metadata.clone();
            merged.extend(entries);
            if merged != self.metadata {
                changes.insert("metadata".to_owned(), json!({ "updated": true }));
                self.metadata = merged;
            }
        }

        if !changes.is_empty() {
            self.updated_at = clock.utc();
            self.add_event(UPDATED_EVENT, actor, changes.clone(), clock);
        }
        changes
    }
}

fn event_details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
