//! Crowdcheck - consensus verification for crowdsourced transcription
//!
//! Volunteers submit independent answers ("entries") for small transcription
//! tasks. Crowdcheck reconciles those answers into a single trusted value
//! with a confidence score, decides whether a task is verified, needs more
//! entries, or needs a moderator, and keeps progress estimates for every
//! task and document up to date.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports the engine consumes
//! - **Service Layer** (`services`): reconciliation, verification policy, progress
//! - **Adapters** (`adapters`): in-memory and SQLite repositories
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use crowdcheck::services::reconcile_payloads;
//! use crowdcheck::domain::ports::ReconcilerOverrides;
//!
//! let reconciled = reconcile_payloads(&payloads, &ReconcilerOverrides::new())?;
//! println!("{} ({:.2})", reconciled.value, reconciled.confidence);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ChildTask, Config, Decision, Document, Entry, Outcome, Reconciled, Scalar, Shape, Task,
    TaskState, Value,
};
pub use domain::ports::{
    DocumentRepository, EntryRepository, FieldReconciler, ReconcilerOverrides, TaskFilter,
    TaskRepository, TaskType,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    reconcile_payloads, ProgressAggregator, TaskService, TaskTypeRegistry, VerificationService,
};
