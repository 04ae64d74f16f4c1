//! Infrastructure layer module
//!
//! Ambient concerns shared by the CLI and library users:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
