//! Repository port for task persistence.

use crate::task::domain::{Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// Implementations serialize their read-modify-write sequences behind a
/// single exclusive lock per repository instance.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts the task or replaces the stored task with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the backing store
    /// cannot be written.
    async fn save(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn get(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns every stored task in no particular order.
    async fn list(&self) -> TaskRepositoryResult<Vec<Task>>;

    /// Removes a task, returning whether it existed.
    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<bool>;

    /// Removes every stored task.
    async fn clear(&self) -> TaskRepositoryResult<()>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A stored record could not be decoded into a task.
    #[error("corrupt task record {id}: {reason}")]
    CorruptRecord {
        /// Identifier column of the offending record.
        id: String,
        /// Decoding failure description.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
