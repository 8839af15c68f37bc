//! When steps for task status transition BDD scenarios.

use super::world::{TaskTransitionWorld, parse_status, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"the task is moved to "{status}""#)]
fn move_task(world: &mut TaskTransitionWorld, status: String) -> Result<(), eyre::Report> {
    let target = parse_status(&status)?;
    let id = world.task()?.id();
    let outcome = run_async(world.service.transition_status(id, target, "scenario"))
        .wrap_err("transition task")?;
    let stored = run_async(world.service.get_task(id)).wrap_err("reload task")?;
    world.task = stored;
    world.last_transition = Some(outcome);
    Ok(())
}
