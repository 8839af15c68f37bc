//! `SQLite` repository implementation for task storage.

use super::{
    models::TaskRow,
    schema::{CREATE_TASKS_TABLE, tasks},
};
use crate::task::{
    adapters::record::TaskDocument,
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use std::io;
use std::path::Path;
use tracing::debug;

/// Events retained per task row.
pub const TABLE_EVENT_WINDOW: usize = 100;

/// `SQLite` connection pool type used by task adapters.
pub type TaskSqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// `SQLite`-backed task repository.
///
/// The pool holds a single connection so writes from concurrent callers are
/// serialised.
#[derive(Debug, Clone)]
pub struct SqliteTaskRepository {
    pool: TaskSqlitePool,
}

impl SqliteTaskRepository {
    /// Creates a new repository from an existing connection pool.
    ///
    /// The caller is responsible for running [`Self::migrate`] before use.
    #[must_use]
    pub const fn new(pool: TaskSqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (or creates) the database file at `path` and ensures the task
    /// table exists.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the path is not valid
    /// UTF-8, the parent directory cannot be created, the pool cannot connect,
    /// or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> TaskRepositoryResult<Self> {
        let location = path.as_ref();
        let Some(database_url) = location.to_str() else {
            return Err(TaskRepositoryError::persistence(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("database path {} is not valid UTF-8", location.display()),
            )));
        };
        if let Some(parent) = location.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(TaskRepositoryError::persistence)?;
        }
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(TaskRepositoryError::persistence)?;
        let repository = Self::new(pool);
        repository.migrate().await?;
        debug!(path = %location.display(), "opened sqlite task store");
        Ok(repository)
    }

    /// Creates the task table and indexes when missing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the DDL fails.
    pub async fn migrate(&self) -> TaskRepositoryResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(CREATE_TASKS_TABLE)
                .map_err(TaskRepositoryError::persistence)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn save(&self, task: &Task) -> TaskRepositoryResult<()> {
        let row = TaskRow::from_document(TaskDocument::from_task(task, TABLE_EVENT_WINDOW))?;
        self.run_blocking(move |connection| {
            diesel::replace_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.to_string()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list(&self) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(|connection| {
            let rows = tasks::table
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<bool> {
        self.run_blocking(move |connection| {
            let removed = diesel::delete(tasks::table.filter(tasks::id.eq(id.to_string())))
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> TaskRepositoryResult<()> {
        self.run_blocking(|connection| {
            diesel::delete(tasks::table)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    row.into_document()?.into_task()
}
