//! `SQLite` adapters for task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{SqliteTaskRepository, TABLE_EVENT_WINDOW, TaskSqlitePool};
