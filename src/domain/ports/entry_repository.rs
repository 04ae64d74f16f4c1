use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Document, Entry};

/// Repository port for entries. Entries are append-only.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Store a new entry. A user may submit at most one entry per task;
    /// a second one fails with `DomainError::DuplicateEntry`.
    async fn create(&self, entry: &Entry) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Entry>>;

    /// All entries of a task in submission order
    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<Entry>>;

    async fn count_for_task(&self, task_id: Uuid) -> DomainResult<usize>;
}

/// Repository port for documents
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: &Document) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>>;

    async fn list(&self) -> DomainResult<Vec<Document>>;

    /// Overwrite the aggregate progress of a document
    async fn update_progress(&self, id: Uuid, progress: f64) -> DomainResult<()>;
}
