//! Agent roles that tasks can be assigned to.

use super::ParseAgentRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role tag identifying which agent owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Coordinates the other agents.
    Orchestrator,
    /// Implements changes.
    Developer,
    /// Owns system design.
    Architect,
    /// Gathers and analyses requirements.
    Analyst,
    /// Verifies quality.
    Qa,
    /// Product manager.
    Pm,
    /// Product owner.
    Po,
    /// Scrum master.
    Sm,
    /// Owns interface and interaction design.
    DesignArchitect,
}

impl AgentRole {
    /// Every role in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Orchestrator,
        Self::Developer,
        Self::Architect,
        Self::Analyst,
        Self::Qa,
        Self::Pm,
        Self::Po,
        Self::Sm,
        Self::DesignArchitect,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Developer => "developer",
            Self::Architect => "architect",
            Self::Analyst => "analyst",
            Self::Qa => "qa",
            Self::Pm => "pm",
            Self::Po => "po",
            Self::Sm => "sm",
            Self::DesignArchitect => "design_architect",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentRole {
    type Error = ParseAgentRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseAgentRoleError(value.to_owned()))
    }
}

impl FromStr for AgentRole {
    type Err = ParseAgentRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(value)
    }
}
