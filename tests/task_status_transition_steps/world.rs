//! Shared world state for task status transition BDD scenarios.

use std::sync::Arc;

use crate::test_helpers::SteppingClock;
use rstest::fixture;
use taskhub::{
    events::EventBus,
    observability::ConsoleObservability,
    task::{
        adapters::memory::InMemoryTaskRepository,
        domain::{Task, TaskStatus},
        services::TaskService,
    },
};

/// Service type used by the BDD world.
pub type TestTaskService = TaskService<InMemoryTaskRepository, SteppingClock>;

/// Scenario world for task transition behaviour tests.
pub struct TaskTransitionWorld {
    pub service: TestTaskService,
    pub observability: Arc<ConsoleObservability>,
    pub task: Option<Task>,
    pub last_transition: Option<Option<Task>>,
}

impl TaskTransitionWorld {
    /// Creates a world with an empty store and console metrics.
    #[must_use]
    pub fn new() -> Self {
        let observability = Arc::new(ConsoleObservability::new(false));
        let service = TaskService::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(EventBus::new()),
            Arc::new(SteppingClock::minutes()),
        )
        .with_observability(observability.clone());

        Self {
            service,
            observability,
            task: None,
            last_transition: None,
        }
    }

    /// Returns the scenario task or an error when none was created.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for TaskTransitionWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskTransitionWorld {
    TaskTransitionWorld::default()
}

/// Parses a status named in a feature file.
pub fn parse_status(raw: &str) -> Result<TaskStatus, eyre::Report> {
    TaskStatus::try_from(raw).map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
