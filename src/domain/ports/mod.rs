//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the verification engine consumes:
//! - TaskRepository / EntryRepository / DocumentRepository: storage
//! - TaskType: per-task-type hooks supplied by application code
//!
//! These traits keep the engine independent of storage and of the
//! application's domain schema.

pub mod entry_repository;
pub mod task_repository;
pub mod task_type;

pub use entry_repository::{DocumentRepository, EntryRepository};
pub use task_repository::{TaskFilter, TaskRepository};
pub use task_type::{FieldReconciler, ReconcilerOverrides, TaskType};
