//! Contract tests run against every task repository backend.

#[path = "test_helpers/mod.rs"]
mod test_helpers;

use eyre::ensure;
use rstest::rstest;
use serde_json::{Map, json};
use std::path::Path;
use std::sync::Arc;
use taskhub::{
    config::StorageBackend,
    task::{
        adapters::{
            json_file::{CORRUPT_SUFFIX, JsonFileTaskRepository},
            record::EXPORT_EVENT_WINDOW,
            sqlite::{SqliteTaskRepository, TABLE_EVENT_WINDOW},
        },
        domain::{AgentRole, Priority, Task, TaskDetails, TaskEvent, TaskStatus},
        ports::{TaskRepository, TaskRepositoryError},
    },
};
use tempfile::TempDir;
use test_helpers::SteppingClock;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Json,
    Sqlite,
}

impl Backend {
    fn storage(self, dir: &Path) -> StorageBackend {
        match self {
            Self::Memory => StorageBackend::Memory,
            Self::Json => StorageBackend::JsonFile {
                path: dir.join("tasks.json"),
            },
            Self::Sqlite => StorageBackend::Sqlite {
                path: dir.join("tasks.db"),
            },
        }
    }
}

async fn open(backend: Backend) -> eyre::Result<(TempDir, Arc<dyn TaskRepository>)> {
    let dir = TempDir::new()?;
    let repository = backend.storage(dir.path()).open_repository().await?;
    Ok((dir, repository))
}

fn sample_task(clock: &SteppingClock, title: &str) -> Task {
    let details = TaskDetails {
        description: "Wire the payment provider".to_owned(),
        priority: Priority::High,
        assignee: Some(AgentRole::Developer),
        labels: vec!["backend".to_owned(), "payments".to_owned()],
        metadata: Map::from_iter([("source".to_owned(), json!("manual"))]),
        ..TaskDetails::new(title)
    };
    Task::new(details, clock)
}

fn with_events(clock: &SteppingClock, count: usize) -> Task {
    let mut task = sample_task(clock, "Chatty");
    for index in 0..count {
        task.add_event("note", "dev", Map::from_iter([("n".to_owned(), json!(index))]), clock);
    }
    task
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::json(Backend::Json)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test(flavor = "multi_thread")]
async fn save_get_and_overwrite(#[case] backend: Backend) -> eyre::Result<()> {
    let (_dir, repository) = open(backend).await?;
    let clock = SteppingClock::minutes();
    let mut task = sample_task(&clock, "Integrate payments");
    repository.save(&task).await?;

    let stored = repository.get(task.id()).await?;
    ensure!(stored.as_ref().map(Task::title) == Some("Integrate payments"));
    ensure!(stored.as_ref().map(Task::labels) == Some(task.labels()));
    ensure!(stored.as_ref().map(Task::priority) == Some(Priority::High));

    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    repository.save(&task).await?;

    let listed = repository.list().await?;
    ensure!(listed.len() == 1);
    ensure!(listed.first().map(Task::status) == Some(TaskStatus::InProgress));
    ensure!(listed.first().and_then(Task::started_at) == task.started_at());
    Ok(())
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::json(Backend::Json)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test(flavor = "multi_thread")]
async fn delete_and_clear(#[case] backend: Backend) -> eyre::Result<()> {
    let (_dir, repository) = open(backend).await?;
    let clock = SteppingClock::minutes();
    let first = sample_task(&clock, "First");
    let second = sample_task(&clock, "Second");
    repository.save(&first).await?;
    repository.save(&second).await?;

    ensure!(repository.delete(first.id()).await?);
    ensure!(!repository.delete(first.id()).await?);
    ensure!(repository.get(first.id()).await?.is_none());
    ensure!(repository.list().await?.len() == 1);

    repository.clear().await?;
    ensure!(repository.list().await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn json_store_survives_reopen_with_trailing_events() -> eyre::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("tasks.json");
    let clock = SteppingClock::minutes();
    let task = with_events(&clock, 14);

    JsonFileTaskRepository::open(&path).await?.save(&task).await?;
    ensure!(path.exists());

    let reopened = JsonFileTaskRepository::open(&path).await?;
    let Some(stored) = reopened.get(task.id()).await? else {
        eyre::bail!("task missing after reopen");
    };
    ensure!(stored.events().len() == EXPORT_EVENT_WINDOW);
    ensure!(stored.events().last().map(TaskEvent::id) == task.events().last().map(TaskEvent::id));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn corrupt_json_store_is_moved_aside_before_writing() -> eyre::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    let quarantined = dir.path().join(format!("tasks.json{CORRUPT_SUFFIX}"));
    tokio::fs::write(&path, "{ not json").await?;

    let repository = JsonFileTaskRepository::open(&path).await?;
    ensure!(repository.list().await?.is_empty());
    ensure!(tokio::fs::read_to_string(&quarantined).await? == "{ not json");

    let clock = SteppingClock::minutes();
    repository.save(&sample_task(&clock, "Fresh start")).await?;
    ensure!(repository.list().await?.len() == 1);
    ensure!(tokio::fs::read_to_string(&quarantined).await? == "{ not json");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_corruption_keeps_earlier_copies() -> eyre::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tasks.json");
    let repository = JsonFileTaskRepository::open(&path).await?;

    tokio::fs::write(&path, "first").await?;
    ensure!(repository.list().await?.is_empty());
    tokio::fs::write(&path, "second").await?;
    ensure!(repository.list().await?.is_empty());

    let first = dir.path().join(format!("tasks.json{CORRUPT_SUFFIX}"));
    let second = dir.path().join(format!("tasks.json{CORRUPT_SUFFIX}.1"));
    ensure!(tokio::fs::read_to_string(&first).await? == "first");
    ensure!(tokio::fs::read_to_string(&second).await? == "second");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sqlite_store_survives_reopen_with_wider_event_window() -> eyre::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("db").join("tasks.db");
    let clock = SteppingClock::minutes();
    let task = with_events(&clock, 120);

    SqliteTaskRepository::open(&path).await?.save(&task).await?;

    let reopened = SqliteTaskRepository::open(&path).await?;
    let Some(stored) = reopened.get(task.id()).await? else {
        eyre::bail!("task missing after reopen");
    };
    ensure!(stored.events().len() == TABLE_EVENT_WINDOW);
    ensure!(stored.metadata() == task.metadata());
    Ok(())
}

#[cfg(unix)]
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sqlite_rejects_paths_that_are_not_utf8() -> eyre::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new()?;
    let path = dir.path().join(OsStr::from_bytes(b"tasks-\xff.db"));

    let outcome = SqliteTaskRepository::open(&path).await;

    ensure!(matches!(outcome, Err(TaskRepositoryError::Persistence(_))));
    ensure!(!path.exists());
    let lossy = dir.path().join("tasks-\u{fffd}.db");
    ensure!(!lossy.exists());
    Ok(())
}
