//! Error types for task domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing or updating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A status string did not name a known status.
    #[error(transparent)]
    Status(#[from] ParseTaskStatusError),

    /// A priority string did not name a known priority.
    #[error(transparent)]
    Priority(#[from] ParsePriorityError),

    /// An assignee string did not name a known agent role.
    #[error(transparent)]
    Assignee(#[from] ParseAgentRoleError),

    /// Metadata updates must be supplied as a JSON object.
    #[error("task metadata must be a JSON object")]
    MetadataNotAnObject,

    /// An update field carried a value of the wrong JSON type.
    #[error("task field '{field}' must be a {expected}")]
    InvalidUpdateField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the expected JSON type.
        expected: &'static str,
    },
}

/// Error returned while parsing task statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParsePriorityError(pub String);

/// Error returned while parsing assignee roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent role: {0}")]
pub struct ParseAgentRoleError(pub String);
