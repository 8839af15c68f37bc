//! Application services for task orchestration.
//!
//! [`TaskService`] drives every use case. The supporting modules hold the
//! request and query value types, story document parsing, the summary
//! report and plugin wiring.

mod plugin;
mod query;
mod request;
mod story;
mod summary;
mod tracker;

pub use plugin::{LifecycleHook, TaskPlugin};
pub use query::TaskQuery;
pub use request::CreateTaskRequest;
pub use story::{ParsedStory, StoryTask, parse_story};
pub use summary::MetricsSummary;
pub use tracker::{TaskService, TaskServiceError, TaskServiceResult};
