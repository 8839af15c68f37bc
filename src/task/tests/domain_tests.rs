//! Unit tests for task entity bookkeeping and field updates.

use super::SteppingClock;
use crate::task::domain::{
    AgentRole, CREATED_EVENT, Priority, STATUS_CHANGED_EVENT, Task, TaskDetails, TaskDomainError,
    TaskStatus, TaskUpdate, UPDATED_EVENT,
};
use eyre::{bail, ensure};
use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};

#[fixture]
fn clock() -> SteppingClock {
    SteppingClock::minutes()
}

#[expect(clippy::float_arithmetic, reason = "durations are compared within a tolerance")]
fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|value| (value - expected).abs() < 1e-9)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[rstest]
fn new_task_is_pending_with_created_event(clock: SteppingClock) -> eyre::Result<()> {
    let details = TaskDetails {
        priority: Priority::High,
        assignee: Some(AgentRole::Qa),
        ..TaskDetails::new("Write release notes")
    };
    let task = Task::new(details, &clock);

    ensure!(task.status() == TaskStatus::Pending);
    ensure!(task.created_at() == task.updated_at());
    ensure!(task.started_at().is_none());
    ensure!(task.completed_at().is_none());
    let [event] = task.events() else {
        bail!("expected one event, got {}", task.events().len());
    };
    ensure!(event.kind() == CREATED_EVENT);
    ensure!(event.actor() == "system");
    ensure!(event.details().get("priority") == Some(&json!("high")));
    ensure!(event.details().get("assignee") == Some(&json!("qa")));
    Ok(())
}

#[rstest]
fn started_at_is_set_once_across_blocked_excursions(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Refactor parser"), &clock);
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    let first_start = task.started_at();
    ensure!(first_start.is_some());
    ensure!(approx(task.metrics().time_to_start, 120.0));

    ensure!(task.transition_to(TaskStatus::Blocked, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.started_at() == first_start);
    ensure!(task.metrics().blocks_encountered == 1);
    Ok(())
}

#[rstest]
fn completion_records_durations_from_created_and_started(
    clock: SteppingClock,
) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Ship feature"), &clock);
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::Blocked, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::Completed, "dev", &clock));

    let Some(completed_at) = task.completed_at() else {
        bail!("completed task must carry a completion time");
    };
    let Some(started_at) = task.started_at() else {
        bail!("completed task must carry a start time");
    };
    ensure!(completed_at >= started_at);
    ensure!(started_at >= task.created_at());
    ensure!(approx(task.metrics().time_in_progress, 360.0));
    ensure!(approx(task.metrics().total_duration, 480.0));
    ensure!(task.metrics().state_changes == 4);
    ensure!(task.updated_at() == completed_at);
    Ok(())
}

#[rstest]
fn failed_task_counts_retries_when_resumed(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Flaky migration"), &clock);
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::Failed, "dev", &clock));
    ensure!(task.completed_at().is_some());
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));

    ensure!(task.metrics().retry_count == 1);
    ensure!(task.metrics().state_changes == 3);
    Ok(())
}

#[rstest]
fn completion_after_retry_overwrites_failure_stamp(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Rerun import"), &clock);
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.transition_to(TaskStatus::Failed, "dev", &clock));
    let Some(failed_at) = task.completed_at() else {
        bail!("failed task must carry a completion time");
    };
    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    ensure!(task.completed_at() == Some(failed_at));
    ensure!(task.transition_to(TaskStatus::Completed, "dev", &clock));

    let Some(completed_at) = task.completed_at() else {
        bail!("completed task must carry a completion time");
    };
    ensure!(completed_at > failed_at);
    ensure!(task.updated_at() == completed_at);
    ensure!(approx(task.metrics().time_in_progress, 360.0));
    ensure!(approx(task.metrics().total_duration, 480.0));
    Ok(())
}

#[rstest]
fn accepted_transition_appends_status_changed_event(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Review docs"), &clock);
    ensure!(task.transition_to(TaskStatus::Blocked, "reviewer", &clock));

    let Some(event) = task.events().last() else {
        bail!("expected a status event");
    };
    ensure!(event.kind() == STATUS_CHANGED_EVENT);
    ensure!(event.actor() == "reviewer");
    ensure!(event.details().get("from") == Some(&json!("pending")));
    ensure!(event.details().get("to") == Some(&json!("blocked")));
    Ok(())
}

#[rstest]
fn metrics_map_omits_unset_fields(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Measure"), &clock);
    ensure!(task.metrics().to_map().is_empty());

    ensure!(task.transition_to(TaskStatus::InProgress, "dev", &clock));
    let map = task.metrics().to_map();
    ensure!(map.contains_key("time_to_start"));
    ensure!(map.get("state_changes") == Some(&json!(1)));
    ensure!(!map.contains_key("total_duration"));
    ensure!(!map.contains_key("retry_count"));
    Ok(())
}

#[rstest]
fn add_event_accepts_free_form_kinds(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Annotate"), &clock);
    let event = task.add_event("commented", "pm", object(json!({ "note": "hi" })), &clock);

    ensure!(task.events().last() == Some(&event));
    let apm = event.to_apm_format();
    ensure!(apm.get("type") == Some(&json!("commented")));
    ensure!(apm.get("task_id") == Some(&json!(task.id().to_string())));
    ensure!(apm.get("correlation_id") == Some(&Value::Null));
    Ok(())
}

#[rstest]
fn update_without_differences_changes_nothing(clock: SteppingClock) -> eyre::Result<()> {
    let mut task = Task::new(TaskDetails::new("Same"), &clock);
    let before = task.clone();
    let update = TaskUpdate {
        title: Some("Same".to_owned()),
        priority: Some(Priority::Medium),
        labels: Some(Vec::new()),
        metadata: Some(Map::new()),
        ..TaskUpdate::default()
    };

    let changes = task.apply_update(update, "pm", &clock);

    ensure!(changes.is_empty());
    ensure!(task == before);
    Ok(())
}

#[rstest]
fn update_records_only_changed_fields(clock: SteppingClock) -> eyre::Result<()> {
    let details = TaskDetails {
        metadata: object(json!({ "team": "core", "sprint": 1 })),
        ..TaskDetails::new("Old title")
    };
    let mut task = Task::new(details, &clock);
    let created_at = task.updated_at();
    let update = TaskUpdate {
        title: Some("New title".to_owned()),
        description: Some(String::new()),
        assignee: Some(Some(AgentRole::Developer)),
        metadata: Some(object(json!({ "sprint": 2 }))),
        ..TaskUpdate::default()
    };

    let changes = task.apply_update(update, "pm", &clock);

    ensure!(changes.len() == 3);
    ensure!(changes.get("title") == Some(&json!({ "from": "Old title", "to": "New title" })));
    ensure!(changes.get("assignee") == Some(&json!({ "from": null, "to": "developer" })));
    ensure!(changes.get("metadata") == Some(&json!({ "updated": true })));
    ensure!(task.metadata() == &object(json!({ "team": "core", "sprint": 2 })));
    ensure!(task.updated_at() > created_at);
    let Some(event) = task.events().last() else {
        bail!("expected an update event");
    };
    ensure!(event.kind() == UPDATED_EVENT);
    ensure!(event.details() == &changes);
    Ok(())
}

#[rstest]
fn json_update_parses_known_fields() -> eyre::Result<()> {
    let update = TaskUpdate::from_json(&object(json!({
        "priority": "CRITICAL",
        "assignee": null,
        "labels": ["a", "b"],
        "unknown": 1
    })))?;

    ensure!(update.priority == Some(Priority::Critical));
    ensure!(update.assignee == Some(None));
    ensure!(update.labels == Some(vec!["a".to_owned(), "b".to_owned()]));
    ensure!(update.title.is_none());
    Ok(())
}

#[rstest]
#[case(json!({ "priority": "urgent" }))]
#[case(json!({ "assignee": "intern" }))]
#[case(json!({ "labels": "not-a-list" }))]
#[case(json!({ "metadata": [1, 2] }))]
#[case(json!({ "title": 7 }))]
fn json_update_rejects_malformed_values(#[case] raw: Value) {
    let result: Result<TaskUpdate, TaskDomainError> = TaskUpdate::from_json(&object(raw));
    assert!(result.is_err());
}
