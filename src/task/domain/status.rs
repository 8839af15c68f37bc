//! Task lifecycle status and the transition policy between statuses.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but work has not started.
    Pending,
    /// Task is being worked on.
    InProgress,
    /// Task work finished successfully.
    Completed,
    /// Task work cannot proceed until something else happens.
    Blocked,
    /// Task work finished unsuccessfully.
    Failed,
    /// Task has been retired and accepts no further transitions.
    Archived,
}

impl TaskStatus {
    /// Every status in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Blocked,
        Self::Failed,
        Self::Archived,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    /// Returns the statuses reachable from `self` in a single transition.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Blocked, Self::Archived],
            Self::InProgress => &[Self::Completed, Self::Blocked, Self::Failed],
            Self::Blocked => &[Self::InProgress, Self::Failed, Self::Archived],
            Self::Completed => &[Self::Archived],
            Self::Failed => &[Self::InProgress, Self::Archived],
            Self::Archived => &[],
        }
    }

    /// Returns whether moving from `self` to `target` is permitted.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Returns whether the status has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Archived)
    }

    /// Returns whether the status records the outcome of the work.
    ///
    /// Entering an outcome status stamps the completion time and the
    /// duration metrics.
    #[must_use]
    pub const fn is_outcome(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Returns whether the status policy allows moving from `from` to `to`.
#[must_use]
pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    from.can_transition_to(to)
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            "failed" => Ok(Self::Failed),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(value)
    }
}
