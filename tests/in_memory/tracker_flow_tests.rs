//! In-memory integration tests for the end-to-end tracker flow.

use super::helpers::{CHECKOUT_STORY, Tracker, tracker, tracker_with};
use eyre::{bail, ensure};
use rstest::rstest;
use std::sync::Arc;
use taskhub::{
    observability::{Observability, PrometheusObservability},
    task::{
        domain::{AgentRole, Priority, Task, TaskStatus},
        services::{CreateTaskRequest, TaskQuery},
    },
};

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(Task::title).collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn extracted_story_tasks_can_be_queried_and_progressed(
    tracker: Tracker,
) -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let story = dir.path().join("checkout.md");
    std::fs::write(&story, CHECKOUT_STORY)?;
    let service = &tracker.service;

    let extracted = service.extract_tasks_from_story(&story).await?;
    ensure!(
        titles(&extracted) == vec!["[1] Cart model", "[2] Cart page", "[2.1] Cart tests"]
    );
    let story_id = extracted
        .first()
        .and_then(Task::story_id)
        .ok_or_else(|| eyre::eyre!("extracted tasks must carry the story id"))?;

    let by_story = service
        .query_tasks(&TaskQuery::new().with_story_id(story_id))
        .await?;
    ensure!(titles(&by_story) == vec!["[1] Cart model", "[2] Cart page", "[2.1] Cart tests"]);

    let frontend = service
        .query_tasks(&TaskQuery::new().with_labels(vec!["frontend".to_owned()]))
        .await?;
    let [page] = frontend.as_slice() else {
        bail!("expected exactly one frontend task");
    };
    ensure!(page.assignee() == Some(AgentRole::DesignArchitect));
    ensure!(page.priority() == Priority::Medium);

    for status in [TaskStatus::InProgress, TaskStatus::Completed] {
        service.transition_status(page.id(), status, "designer").await?;
    }
    let summary = service.get_metrics_summary().await?;
    ensure!(summary.total_tasks == 3);
    ensure!(summary.by_status.get("completed") == Some(&1));
    ensure!(summary.by_status.get("pending") == Some(&2));
    ensure!(summary.by_priority.get("critical") == Some(&1));
    ensure!(summary.by_assignee.len() == 3);
    ensure!(summary.average_duration.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn story_without_tasks_extracts_nothing(tracker: Tracker) -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let story = dir.path().join("empty.md");
    std::fs::write(&story, "# Story\nNothing planned yet.\n")?;

    let extracted = tracker.service.extract_tasks_from_story(&story).await?;

    ensure!(extracted.is_empty());
    ensure!(tracker.service.query_tasks(&TaskQuery::new()).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn query_limit_keeps_the_most_urgent_tasks(tracker: Tracker) -> eyre::Result<()> {
    let service = &tracker.service;
    for (title, priority) in [
        ("low", Priority::Low),
        ("critical", Priority::Critical),
        ("high", Priority::High),
        ("medium", Priority::Medium),
    ] {
        service
            .create_task(CreateTaskRequest::new(title).with_priority(priority))
            .await?;
    }

    let top = service.query_tasks(&TaskQuery::new().with_limit(2)).await?;

    ensure!(titles(&top) == vec!["critical", "high"]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn prometheus_backend_exposes_operation_counts() -> eyre::Result<()> {
    let prometheus = Arc::new(PrometheusObservability::new());
    let shared: Arc<dyn Observability> = prometheus.clone();
    let tracker = tracker_with(Some(shared));
    let service = &tracker.service;

    let task = service
        .create_task(CreateTaskRequest::new("Expose metrics"))
        .await?;
    service
        .transition_status(task.id(), TaskStatus::Completed, "dev")
        .await?;

    let exposition = prometheus.render();
    ensure!(exposition.contains(
        r#"task_operations_total{operation="task.create",status="success"} 1"#
    ));
    ensure!(exposition.contains(
        r#"task_operations_total{operation="task.transition_status",status="success"} 1"#
    ));
    ensure!(exposition.contains(
        r#"task_transition_invalid{from="pending",to="completed"} 1"#
    ));
    ensure!(exposition.contains("# TYPE task_create_duration_seconds histogram"));
    Ok(())
}
