//! CLI command implementations.

pub mod document;
pub mod entry;
pub mod init;
pub mod task;
