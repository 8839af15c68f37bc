//! Diesel schema for task persistence in `SQLite`.

diesel::table! {
    /// Task records with JSON-encoded collections.
    tasks (id) {
        /// Task identifier (UUID text).
        id -> Text,
        /// Task title.
        title -> Text,
        /// Task description.
        description -> Nullable<Text>,
        /// Lifecycle status.
        status -> Text,
        /// Priority level.
        priority -> Text,
        /// Story correlation identifier.
        story_id -> Nullable<Text>,
        /// Epic correlation identifier.
        epic_id -> Nullable<Text>,
        /// Assigned role.
        assignee -> Nullable<Text>,
        /// JSON array of labels.
        labels -> Text,
        /// JSON object of metadata.
        metadata -> Text,
        /// RFC 3339 creation timestamp.
        created_at -> Text,
        /// RFC 3339 modification timestamp.
        updated_at -> Text,
        /// RFC 3339 start timestamp.
        started_at -> Nullable<Text>,
        /// RFC 3339 completion timestamp.
        completed_at -> Nullable<Text>,
        /// JSON object of populated metrics.
        metrics -> Text,
        /// JSON array holding the trailing event window.
        events -> Text,
    }
}

/// DDL creating the task table and its lookup indexes.
pub const CREATE_TASKS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    story_id TEXT,
    epic_id TEXT,
    assignee TEXT,
    labels TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    metrics TEXT NOT NULL,
    events TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee);
CREATE INDEX IF NOT EXISTS idx_tasks_story_id ON tasks(story_id);
";
