//! Taskhub: task tracking with pluggable storage, events and observability.
//!
//! This crate models work items with an enforced status state machine and
//! orchestrates their lifecycle through a single service that persists,
//! publishes and measures every change.
//!
//! # Architecture
//!
//! Taskhub follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (files, databases, etc.)
//!
//! # Modules
//!
//! - [`task`]: Task entity, persistence and orchestration
//! - [`events`]: In-process publish/subscribe bus with bounded history
//! - [`observability`]: Spans and metrics behind a backend-neutral port
//! - [`config`]: Typed backend selection
//! - [`telemetry`]: Logging subscriber set-up for binaries

pub mod config;
pub mod events;
pub mod observability;
pub mod task;
pub mod telemetry;
