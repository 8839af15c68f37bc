//! Given steps for task status transition BDD scenarios.

use super::world::{TaskTransitionWorld, parse_status, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskhub::task::services::CreateTaskRequest;

#[given(r#"a pending task titled "{title}""#)]
fn pending_task(world: &mut TaskTransitionWorld, title: String) -> Result<(), eyre::Report> {
    let created = run_async(world.service.create_task(CreateTaskRequest::new(title)))
        .wrap_err("create task for transition scenario")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"the task has been moved to "{status}""#)]
fn task_has_been_moved(world: &mut TaskTransitionWorld, status: String) -> Result<(), eyre::Report> {
    let target = parse_status(&status)?;
    let id = world.task()?.id();
    let moved = run_async(world.service.transition_status(id, target, "scenario"))
        .wrap_err("transition task in scenario setup")?
        .ok_or_else(|| eyre::eyre!("setup transition to {status} was rejected"))?;
    world.task = Some(moved);
    Ok(())
}
