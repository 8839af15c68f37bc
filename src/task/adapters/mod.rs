//! Adapter implementations of the task ports.

pub mod json_file;
pub mod memory;
pub mod record;
pub mod sqlite;
