//! Domain layer for the crowdcheck verification engine
//!
//! This module contains core models, errors and the ports the engine
//! consumes.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
