//! Task tracking for Taskhub.
//!
//! This module implements task creation, field updates, validated status
//! transitions, story document extraction, filtered queries and aggregate
//! statistics. Status changes follow the table in
//! [`domain::TaskStatus::allowed_transitions`]. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
