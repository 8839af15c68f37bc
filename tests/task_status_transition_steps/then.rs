//! Then steps for task status transition BDD scenarios.

use super::world::{TaskTransitionWorld, parse_status};
use rstest_bdd_macros::then;
use taskhub::observability::MetricAggregate;

#[then("the transition is accepted")]
fn transition_accepted(world: &TaskTransitionWorld) -> Result<(), eyre::Report> {
    match &world.last_transition {
        Some(Some(_)) => Ok(()),
        other => Err(eyre::eyre!("expected an accepted transition, got {other:?}")),
    }
}

#[then("the transition is rejected")]
fn transition_rejected(world: &TaskTransitionWorld) -> Result<(), eyre::Report> {
    match &world.last_transition {
        Some(None) => Ok(()),
        other => Err(eyre::eyre!("expected a rejected transition, got {other:?}")),
    }
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskTransitionWorld, status: String) -> Result<(), eyre::Report> {
    let expected = parse_status(&status)?;
    let actual = world.task()?.status();
    eyre::ensure!(actual == expected, "expected status {expected}, found {actual}");
    Ok(())
}

#[then("the task has a start time")]
fn task_has_start_time(world: &TaskTransitionWorld) -> Result<(), eyre::Report> {
    eyre::ensure!(world.task()?.started_at().is_some(), "task has no start time");
    Ok(())
}

#[then("the task retry count is {count:u32}")]
fn task_retry_count(world: &TaskTransitionWorld, count: u32) -> Result<(), eyre::Report> {
    let actual = world.task()?.metrics().retry_count;
    eyre::ensure!(actual == count, "expected {count} retries, found {actual}");
    Ok(())
}

#[then(r#"{count:u32} invalid transition from "{from}" to "{to}" has been counted"#)]
fn invalid_transition_counted(
    world: &TaskTransitionWorld,
    count: u32,
    from: String,
    to: String,
) -> Result<(), eyre::Report> {
    let key = format!(r#"task.transition.invalid:{{"from":"{from}","to":"{to}"}}"#);
    let metrics = world.observability.snapshot();
    let expected = MetricAggregate::Counter(f64::from(count));
    eyre::ensure!(
        metrics.get(&key) == Some(&expected),
        "expected {key} to be {expected:?}, found {:?}",
        metrics.get(&key)
    );
    Ok(())
}
