//! Domain model for task tracking.
//!
//! The task domain models task identity, the status transition policy,
//! per-task metrics and the append-only task event log while keeping all
//! infrastructure concerns outside of the domain boundary.

mod error;
mod event;
mod ids;
mod metrics;
mod priority;
mod role;
mod status;
mod task;

pub use error::{ParseAgentRoleError, ParsePriorityError, ParseTaskStatusError, TaskDomainError};
pub use event::{CREATED_EVENT, STATUS_CHANGED_EVENT, TaskEvent, UPDATED_EVENT};
pub use ids::{EpicId, StoryId, TaskEventId, TaskId};
pub use metrics::TaskMetrics;
pub use priority::Priority;
pub use role::AgentRole;
pub use status::{TaskStatus, can_transition};
pub use task::{PersistedTaskData, Task, TaskDetails, TaskUpdate};
