use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskState, Value};

/// Filters for querying tasks
#[derive(Default, Debug, Clone)]
pub struct TaskFilter {
    pub state: Option<TaskState>,
    pub doc_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub task_type: Option<String>,
    /// Only tasks without a parent
    pub roots_only: bool,
    pub limit: Option<usize>,
}

/// Repository port for task persistence operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task
    async fn create(&self, task: &Task) -> DomainResult<()>;

    /// Get a task by ID
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Update an existing task.
    ///
    /// Succeeds only if the stored version equals `task.version`; the stored
    /// version becomes `task.version + 1`. A stale version fails with
    /// `DomainError::ConcurrencyConflict`.
    async fn update(&self, task: &Task) -> DomainResult<()>;

    /// Update `task` and advance its in-memory version to match storage.
    async fn save(&self, task: &mut Task) -> DomainResult<()> {
        self.update(task).await?;
        task.version += 1;
        Ok(())
    }

    /// Direct children of a task
    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Task>>;

    /// Root tasks (no parent) serving a document
    async fn get_root_tasks(&self, doc_id: Uuid) -> DomainResult<Vec<Task>>;

    /// List tasks with optional filters, highest priority first
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;

    /// Find the task uniquely identified by type and params
    async fn find_by_type_and_params(
        &self,
        task_type: &str,
        params: &Value,
    ) -> DomainResult<Option<Task>>;

    /// Atomically persist a verified task together with its follow-up tasks.
    ///
    /// Either the task update and every child insert are stored, or nothing is.
    /// The task update follows the same version check as [`Self::update`].
    async fn commit_verification(&self, task: &Task, children: &[Task]) -> DomainResult<()>;
}
