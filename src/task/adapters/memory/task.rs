//! In-memory task repository for tests and local development.

use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, HashMap<TaskId, Task>>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, HashMap<TaskId, Task>>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &Task) -> TaskRepositoryResult<()> {
        self.write()?.insert(task.id(), task.clone());
        Ok(())
    }

    async fn get(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn list(&self) -> TaskRepositoryResult<Vec<Task>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<bool> {
        Ok(self.write()?.remove(&id).is_some())
    }

    async fn clear(&self) -> TaskRepositoryResult<()> {
        self.write()?.clear();
        Ok(())
    }
}
