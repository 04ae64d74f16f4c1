//! Storage adapters for the repository ports.

pub mod memory;
pub mod sqlite;
