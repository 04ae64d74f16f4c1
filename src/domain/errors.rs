//! Domain errors for the crowdcheck verification engine.

use thiserror::Error;
use uuid::Uuid;

/// Format a parent chain as a human-readable string: `A -> B -> C -> A`.
fn format_cycle_path(path: &[Uuid]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Domain-level errors that can occur while reconciling and verifying tasks.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A reconciler was called with an empty or malformed value list.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entry payloads disagree on the shape of a field.
    #[error("Schema mismatch at '{path}': expected {expected}, found {found}")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A task type hook failed while committing verified data.
    #[error("Commit failed: {0}")]
    CommitFailure(String),

    /// A storage collaborator call failed.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// The parent chain of a task loops back on itself.
    #[error("Task parent cycle detected: {}", format_cycle_path(.0))]
    ParentCycle(Vec<Uuid>),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("User {user_id} already submitted an entry for task {task_id}")]
    DuplicateEntry { task_id: Uuid, user_id: Uuid },

    #[error("Task of type '{task_type}' with identical params already exists: {existing}")]
    DuplicateTask { task_type: String, existing: Uuid },

    #[error("No open tasks left")]
    NoTasksLeft,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error belongs to the storage-failure class.
    ///
    /// A broken parent chain is reported here as well: it can only come from
    /// corrupted persisted data.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::StorageFailure(_)
                | Self::ParentCycle(_)
                | Self::ConcurrencyConflict { .. }
                | Self::SerializationError(_)
        )
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_path_formatting() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let err = DomainError::ParentCycle(vec![a, b, a]);
        assert_eq!(
            err.to_string(),
            format!("Task parent cycle detected: {a} -> {b} -> {a}")
        );
    }

    #[test]
    fn test_storage_failure_classification() {
        assert!(DomainError::StorageFailure("disk".into()).is_storage_failure());
        assert!(DomainError::ParentCycle(vec![]).is_storage_failure());
        assert!(!DomainError::InvalidInput("empty".into()).is_storage_failure());
        assert!(!DomainError::CommitFailure("unique".into()).is_storage_failure());
    }
}
