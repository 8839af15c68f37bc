//! Shared fixtures for in-memory integration tests.

use crate::test_helpers::SteppingClock;
use rstest::fixture;
use std::sync::Arc;
use taskhub::{
    events::EventBus,
    observability::Observability,
    task::{adapters::memory::InMemoryTaskRepository, services::TaskService},
};

/// Service type used across the in-memory tests.
pub type TestService = TaskService<InMemoryTaskRepository, SteppingClock>;

/// Shared clock handle alongside the service it drives.
pub struct Tracker {
    pub service: TestService,
    pub clock: Arc<SteppingClock>,
}

/// Builds a tracker around `observability`.
pub fn tracker_with(observability: Option<Arc<dyn Observability>>) -> Tracker {
    let clock = Arc::new(SteppingClock::minutes());
    let mut service = TaskService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(EventBus::new()),
        Arc::clone(&clock),
    );
    if let Some(backend) = observability {
        service = service.with_observability(backend);
    }
    Tracker { service, clock }
}

/// Provides a tracker without observability.
#[fixture]
pub fn tracker() -> Tracker {
    tracker_with(None)
}

/// Story document with three tasks for two roles.
pub const CHECKOUT_STORY: &str = "\
# Story: Checkout
story-id: 6a1f0c3e-2b4d-4c5e-8f9a-0b1c2d3e4f5a

### Task 1: Cart model
**Assignee:** developer
**Priority:** critical
**Labels:** backend, cart
Define the cart aggregate.

### Task 2: Cart page
**Assignee:** design_architect
**Labels:** frontend
Lay out the cart page.

### Task 2.1: Cart tests
**Assignee:** qa
**Priority:** low
Cover empty and full carts.
";
