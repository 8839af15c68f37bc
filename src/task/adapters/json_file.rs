//! JSON file repository storing every task in a single array document.

use super::record::{EXPORT_EVENT_WINDOW, TaskDocument};
use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Suffix of the file an unreadable store is moved to.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

const STAGING_SUFFIX: &str = ".tmp";

/// Task repository persisting to a pretty-printed JSON array on disk.
///
/// Every operation reads the whole file under an exclusive lock; writes
/// replace the file atomically through a sibling temporary file. A file that
/// is not a JSON array is renamed to `<path>.corrupt` (or `.corrupt.1`,
/// `.corrupt.2`, ... when that name is taken) and the store starts empty.
#[derive(Debug)]
pub struct JsonFileTaskRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileTaskRepository {
    /// Opens the repository, creating the file (and parent directories) with
    /// an empty array when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the file or its
    /// parent directory cannot be created.
    pub async fn open(path: impl Into<PathBuf>) -> TaskRepositoryResult<Self> {
        let location: PathBuf = path.into();
        if !tokio::fs::try_exists(&location)
            .await
            .map_err(TaskRepositoryError::persistence)?
        {
            if let Some(parent) = location.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(TaskRepositoryError::persistence)?;
            }
            tokio::fs::write(&location, "[]")
                .await
                .map_err(TaskRepositoryError::persistence)?;
            debug!(path = %location.display(), "created task store file");
        }
        Ok(Self {
            path: location,
            lock: Mutex::new(()),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_tasks(&self) -> TaskRepositoryResult<Vec<Task>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(TaskRepositoryError::persistence(err)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let documents = match serde_json::from_str::<Vec<TaskDocument>>(&content) {
            Ok(parsed) => parsed,
            Err(err) => {
                let moved_to = self.quarantine().await?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %moved_to.display(),
                    error = %err,
                    "task store file is not valid JSON; moved it aside and starting empty"
                );
                return Ok(Vec::new());
            }
        };
        documents.into_iter().map(TaskDocument::into_task).collect()
    }

    async fn quarantine(&self) -> TaskRepositoryResult<PathBuf> {
        let mut target = with_suffix(&self.path, CORRUPT_SUFFIX);
        let mut attempt = 1_u32;
        while tokio::fs::try_exists(&target)
            .await
            .map_err(TaskRepositoryError::persistence)?
        {
            target = with_suffix(&self.path, &format!("{CORRUPT_SUFFIX}.{attempt}"));
            attempt += 1;
        }
        tokio::fs::rename(&self.path, &target)
            .await
            .map_err(TaskRepositoryError::persistence)?;
        Ok(target)
    }

    async fn write_tasks(&self, tasks: &[Task]) -> TaskRepositoryResult<()> {
        let documents: Vec<TaskDocument> = tasks
            .iter()
            .map(|task| TaskDocument::from_task(task, EXPORT_EVENT_WINDOW))
            .collect();
        let content =
            serde_json::to_string_pretty(&documents).map_err(TaskRepositoryError::persistence)?;
        let staging = with_suffix(&self.path, STAGING_SUFFIX);
        tokio::fs::write(&staging, content)
            .await
            .map_err(TaskRepositoryError::persistence)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(TaskRepositoryError::persistence)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl TaskRepository for JsonFileTaskRepository {
    async fn save(&self, task: &Task) -> TaskRepositoryResult<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks().await?;
        tasks.retain(|existing| existing.id() != task.id());
        tasks.push(task.clone());
        self.write_tasks(&tasks).await
    }

    async fn get(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let _guard = self.lock.lock().await;
        let tasks = self.read_tasks().await?;
        Ok(tasks.into_iter().find(|task| task.id() == id))
    }

    async fn list(&self) -> TaskRepositoryResult<Vec<Task>> {
        let _guard = self.lock.lock().await;
        self.read_tasks().await
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<bool> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks().await?;
        let original_count = tasks.len();
        tasks.retain(|task| task.id() != id);
        if tasks.len() == original_count {
            return Ok(false);
        }
        self.write_tasks(&tasks).await?;
        Ok(true)
    }

    async fn clear(&self) -> TaskRepositoryResult<()> {
        let _guard = self.lock.lock().await;
        self.write_tasks(&[]).await
    }
}
