//! Task service orchestrating the entity, storage, event bus and
//! observability.

use super::{
    plugin::TaskPlugin, query::TaskQuery, request::CreateTaskRequest, story::parse_story,
    summary::MetricsSummary,
};
use crate::events::{EventBus, EventKind};
use crate::observability::{
    MetricKind, MetricTags, NoopSpan, Observability, ObservabilityError, OperationSpan,
    SpanStatus,
};
use crate::task::{
    domain::{AgentRole, Task, TaskDomainError, TaskId, TaskStatus, TaskUpdate},
    ports::{TaskRepository, TaskRepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::{Map, Value, json};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors for task operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Metric recording failed.
    #[error(transparent)]
    Observability(#[from] ObservabilityError),
    /// The story file does not exist.
    #[error("story file not found: {}", .0.display())]
    StoryNotFound(PathBuf),
    /// The story file exists but could not be read.
    #[error("failed to read story file {}: {source}", path.display())]
    StoryRead {
        /// Path of the story file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Result type for task service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task orchestration service.
///
/// Each use case mutates the task, persists it, publishes on the event bus
/// and then records metrics, inside one observability span.
pub struct TaskService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    event_bus: Arc<EventBus>,
    clock: Arc<C>,
    observability: Option<Arc<dyn Observability>>,
}

impl<R, C> Clone for TaskService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            event_bus: Arc::clone(&self.event_bus),
            clock: Arc::clone(&self.clock),
            observability: self.observability.clone(),
        }
    }
}

impl<R, C> fmt::Debug for TaskService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("event_bus", &self.event_bus)
            .field("observability", &self.observability.is_some())
            .finish_non_exhaustive()
    }
}

impl<R, C> TaskService<R, C>
where
    R: TaskRepository + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a service without observability.
    #[must_use]
    pub const fn new(repository: Arc<R>, event_bus: Arc<EventBus>, clock: Arc<C>) -> Self {
        Self {
            repository,
            event_bus,
            clock,
            observability: None,
        }
    }

    /// Attaches an observability backend.
    #[must_use]
    pub fn with_observability(mut self, observability: Arc<dyn Observability>) -> Self {
        self.observability = Some(observability);
        self
    }

    /// Returns the event bus the service publishes on.
    #[must_use]
    pub const fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Returns the attached observability backend.
    #[must_use]
    pub const fn observability(&self) -> Option<&Arc<dyn Observability>> {
        self.observability.as_ref()
    }

    /// Creates, persists and announces a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] when persistence or metric recording
    /// fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskServiceResult<Task> {
        let mut span = self.span("task.create");
        let outcome = self.create_task_in(request, span.as_mut()).await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    async fn create_task_in(
        &self,
        request: CreateTaskRequest,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<Task> {
        let priority = request.priority();
        let assignee = request.assignee();
        let task = Task::new(request.into_details(), &*self.clock);

        self.repository.save(&task).await?;
        self.event_bus
            .emit(EventKind::TaskCreated, task.clone(), None, None)
            .await;
        self.record(
            MetricKind::Counter,
            "task.created",
            1.0,
            tags([
                ("priority", priority.as_str().to_owned()),
                (
                    "assignee",
                    assignee.map_or("unassigned", AgentRole::as_str).to_owned(),
                ),
            ]),
        )?;

        span.set_attribute("task.id", json!(task.id().to_string()));
        span.set_attribute("task.priority", json!(priority.as_str()));
        info!(task_id = %task.id(), title = %task.title(), "created task");
        Ok(task)
    }

    /// Applies field changes to a stored task.
    ///
    /// Returns `Ok(None)` when the task does not exist. When no field
    /// actually changes the stored task is returned without saving,
    /// publishing or recording anything.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] when persistence or metric recording
    /// fails.
    pub async fn update_task(
        &self,
        id: TaskId,
        update: TaskUpdate,
        actor: &str,
    ) -> TaskServiceResult<Option<Task>> {
        let mut span = self.span("task.update");
        let outcome = self.update_task_in(id, update, actor, span.as_mut()).await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    /// Parses a loosely typed update and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Domain`] when a priority or assignee value
    /// is not recognised, or a field has the wrong type; otherwise as
    /// [`Self::update_task`].
    pub async fn update_task_from_json(
        &self,
        id: TaskId,
        updates: &Map<String, Value>,
        actor: &str,
    ) -> TaskServiceResult<Option<Task>> {
        let update = TaskUpdate::from_json(updates)?;
        self.update_task(id, update, actor).await
    }

    async fn update_task_in(
        &self,
        id: TaskId,
        update: TaskUpdate,
        actor: &str,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<Option<Task>> {
        let Some(mut task) = self.repository.get(id).await? else {
            debug!(task_id = %id, "update requested for unknown task");
            return Ok(None);
        };

        let changes = task.apply_update(update, actor, &*self.clock);
        if changes.is_empty() {
            return Ok(Some(task));
        }

        self.repository.save(&task).await?;
        let fields_changed = changes.len();
        self.event_bus
            .emit(EventKind::TaskUpdated, task.clone(), Some(changes), None)
            .await;
        self.record(
            MetricKind::Counter,
            "task.updated",
            1.0,
            tags([("fields_changed", fields_changed.to_string())]),
        )?;

        span.set_attribute("task.id", json!(id.to_string()));
        span.set_attribute("task.fields_changed", json!(fields_changed));
        Ok(Some(task))
    }

    /// Moves a stored task to `new_status`.
    ///
    /// Returns `Ok(None)` both when the task does not exist and when the
    /// status policy rejects the transition; use [`Self::get_task`] to tell
    /// the two apart. A rejected transition records the
    /// `task.transition.invalid` counter.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] when persistence or metric recording
    /// fails.
    pub async fn transition_status(
        &self,
        id: TaskId,
        new_status: TaskStatus,
        actor: &str,
    ) -> TaskServiceResult<Option<Task>> {
        let mut span = self.span("task.transition_status");
        let outcome = self
            .transition_status_in(id, new_status, actor, span.as_mut())
            .await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    async fn transition_status_in(
        &self,
        id: TaskId,
        new_status: TaskStatus,
        actor: &str,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<Option<Task>> {
        let Some(mut task) = self.repository.get(id).await? else {
            debug!(task_id = %id, "transition requested for unknown task");
            return Ok(None);
        };

        let old_status = task.status();
        let transition = tags([
            ("from", old_status.as_str().to_owned()),
            ("to", new_status.as_str().to_owned()),
        ]);
        span.set_attribute("task.id", json!(id.to_string()));

        if !task.transition_to(new_status, actor, &*self.clock) {
            debug!(task_id = %id, from = %old_status, to = %new_status, "rejected status transition");
            self.record(MetricKind::Counter, "task.transition.invalid", 1.0, transition)?;
            span.set_attribute("transition.accepted", json!(false));
            return Ok(None);
        }

        self.repository.save(&task).await?;
        let mut details = Map::new();
        details.insert("from".to_owned(), json!(old_status.as_str()));
        details.insert("to".to_owned(), json!(new_status.as_str()));
        self.event_bus
            .emit(EventKind::TaskStatusChanged, task.clone(), Some(details), None)
            .await;
        self.record(MetricKind::Counter, "task.transition", 1.0, transition)?;

        if new_status.is_outcome()
            && let Some(duration) = task
                .metrics()
                .total_duration
                .filter(|seconds| *seconds > 0.0)
        {
            self.record(
                MetricKind::Histogram,
                "task.duration",
                duration,
                tags([
                    ("status", new_status.as_str().to_owned()),
                    ("priority", task.priority().as_str().to_owned()),
                ]),
            )?;
        }

        span.set_attribute("transition.accepted", json!(true));
        info!(task_id = %id, from = %old_status, to = %new_status, actor, "transitioned task");
        Ok(Some(task))
    }

    /// Creates one task per `### Task` block of a story document.
    ///
    /// Tasks are created in document order through [`Self::create_task`] and
    /// tagged with the story identifier found in the document, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::StoryNotFound`] when `path` does not
    /// exist, [`TaskServiceError::StoryRead`] when it cannot be read, and
    /// otherwise as [`Self::create_task`].
    pub async fn extract_tasks_from_story(&self, path: &Path) -> TaskServiceResult<Vec<Task>> {
        let mut span = self.span("task.extract_from_story");
        let outcome = self.extract_tasks_in(path, span.as_mut()).await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    async fn extract_tasks_in(
        &self,
        path: &Path,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<Vec<Task>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => TaskServiceError::StoryNotFound(path.to_path_buf()),
                _ => TaskServiceError::StoryRead {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        let source = path.display().to_string();
        self.event_bus
            .emit(
                EventKind::ExtractionStarted,
                json!({ "source": source }),
                None,
                None,
            )
            .await;

        let story = parse_story(&content);
        let mut tasks = Vec::with_capacity(story.tasks.len());
        for block in story.tasks {
            let mut metadata = Map::new();
            metadata.insert("source".to_owned(), json!(source));
            metadata.insert("task_number".to_owned(), json!(block.number));
            metadata.insert(
                "extracted_at".to_owned(),
                json!(self.clock.utc().to_rfc3339()),
            );
            let mut request = CreateTaskRequest::new(format!("[{}] {}", block.number, block.title))
                .with_description(block.description)
                .with_priority(block.priority)
                .with_labels(block.labels)
                .with_metadata(metadata);
            if let Some(assignee) = block.assignee {
                request = request.with_assignee(assignee);
            }
            if let Some(story_id) = story.story_id {
                request = request.with_story_id(story_id);
            }
            tasks.push(self.create_task(request).await?);
        }

        self.record(
            MetricKind::Counter,
            "task.extracted",
            count_value(tasks.len()),
            tags([("source", "story_file".to_owned())]),
        )?;
        self.event_bus
            .emit(
                EventKind::ExtractionCompleted,
                json!({ "source": source, "count": tasks.len() }),
                None,
                None,
            )
            .await;

        span.set_attribute("tasks.count", json!(tasks.len()));
        span.set_attribute("story.file", json!(source));
        info!(count = tasks.len(), source = %source, "extracted story tasks");
        Ok(tasks)
    }

    /// Returns the stored tasks matching `query`, highest priority first and
    /// then oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] when the repository cannot be listed or
    /// metric recording fails.
    pub async fn query_tasks(&self, query: &TaskQuery) -> TaskServiceResult<Vec<Task>> {
        let mut span = self.span("task.query");
        let outcome = self.query_tasks_in(query, span.as_mut()).await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    async fn query_tasks_in(
        &self,
        query: &TaskQuery,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<Vec<Task>> {
        let tasks = query.apply(self.repository.list().await?);
        self.record(
            MetricKind::Counter,
            "task.query",
            1.0,
            tags([
                ("result_count", tasks.len().to_string()),
                ("has_filters", query.has_filters().to_string()),
            ]),
        )?;
        span.set_attribute("query.result_count", json!(tasks.len()));
        Ok(tasks)
    }

    /// Computes aggregate statistics over every stored task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the repository cannot be
    /// listed.
    pub async fn get_metrics_summary(&self) -> TaskServiceResult<MetricsSummary> {
        let mut span = self.span("task.metrics_summary");
        let outcome = self
            .repository
            .list()
            .await
            .map(|tasks| MetricsSummary::from_tasks(&tasks))
            .map_err(TaskServiceError::from);
        close_span(span.as_mut(), &outcome);
        outcome
    }

    /// Looks up a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the lookup fails.
    pub async fn get_task(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.repository.get(id).await?)
    }

    /// Removes a task from storage and publishes `task.deleted`.
    ///
    /// Returns whether the task existed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] when persistence or metric recording
    /// fails.
    pub async fn delete_task(&self, id: TaskId) -> TaskServiceResult<bool> {
        let mut span = self.span("task.delete");
        let outcome = self.delete_task_in(id, span.as_mut()).await;
        close_span(span.as_mut(), &outcome);
        outcome
    }

    async fn delete_task_in(
        &self,
        id: TaskId,
        span: &mut dyn OperationSpan,
    ) -> TaskServiceResult<bool> {
        span.set_attribute("task.id", json!(id.to_string()));
        let Some(task) = self.repository.get(id).await? else {
            return Ok(false);
        };
        if !self.repository.delete(id).await? {
            return Ok(false);
        }
        self.event_bus
            .emit(EventKind::TaskDeleted, task, None, None)
            .await;
        self.record(MetricKind::Counter, "task.deleted", 1.0, MetricTags::new())?;
        info!(task_id = %id, "deleted task");
        Ok(true)
    }

    /// Returns completed tasks whose completion precedes `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] as [`Self::query_tasks`].
    pub async fn completed_before(&self, cutoff: DateTime<Utc>) -> TaskServiceResult<Vec<Task>> {
        let completed = self
            .query_tasks(&TaskQuery::new().with_status(TaskStatus::Completed))
            .await?;
        Ok(completed
            .into_iter()
            .filter(|task| task.completed_at().is_some_and(|at| at < cutoff))
            .collect())
    }

    /// Archives every task completed before `cutoff`.
    ///
    /// Returns the archived tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError`] as [`Self::transition_status`].
    pub async fn archive_completed_before(
        &self,
        cutoff: DateTime<Utc>,
        actor: &str,
    ) -> TaskServiceResult<Vec<Task>> {
        let mut archived = Vec::new();
        for candidate in self.completed_before(cutoff).await? {
            if let Some(task) = self
                .transition_status(candidate.id(), TaskStatus::Archived, actor)
                .await?
            {
                archived.push(task);
            }
        }
        self.event_bus
            .emit(
                EventKind::BatchUpdated,
                json!({ "status": TaskStatus::Archived.as_str(), "count": archived.len() }),
                None,
                None,
            )
            .await;
        Ok(archived)
    }

    /// Subscribes each present plugin hook to its lifecycle event.
    pub fn register_plugin(&self, plugin: &TaskPlugin) {
        for (kind, handler) in plugin.subscriptions() {
            self.event_bus.subscribe(kind, handler, 0);
        }
        debug!(plugin = plugin.name(), "registered task plugin");
    }

    fn span(&self, operation: &str) -> Box<dyn OperationSpan> {
        self.observability.as_ref().map_or_else(
            || Box::new(NoopSpan) as Box<dyn OperationSpan>,
            |observability| observability.span(operation),
        )
    }

    fn record(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        tags: MetricTags,
    ) -> TaskServiceResult<()> {
        if let Some(observability) = &self.observability {
            observability.record_metric(kind, name, value, &tags)?;
        }
        Ok(())
    }
}

fn close_span<T>(span: &mut dyn OperationSpan, outcome: &TaskServiceResult<T>) {
    if let Err(err) = outcome {
        span.set_status(SpanStatus::Error(err.to_string()));
    }
}

fn tags<const N: usize>(pairs: [(&str, String); N]) -> MetricTags {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "batch sizes stay far below 2^52"
)]
const fn count_value(count: usize) -> f64 {
    count as f64
}
