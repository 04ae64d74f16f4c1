//! Task and document management, and the task chooser.

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChooserConfig, Document, Task, TaskState, Value};
use crate::domain::ports::{DocumentRepository, TaskFilter, TaskRepository};
use crate::services::task_type_registry::TaskTypeRegistry;

pub struct TaskService<T: TaskRepository, D: DocumentRepository> {
    task_repo: Arc<T>,
    document_repo: Arc<D>,
    registry: Arc<TaskTypeRegistry>,
    chooser: ChooserConfig,
}

impl<T: TaskRepository, D: DocumentRepository> TaskService<T, D> {
    pub fn new(task_repo: Arc<T>, document_repo: Arc<D>, registry: Arc<TaskTypeRegistry>) -> Self {
        Self {
            task_repo,
            document_repo,
            registry,
            chooser: ChooserConfig::default(),
        }
    }

    /// Use custom chooser settings.
    pub fn with_chooser(mut self, chooser: ChooserConfig) -> Self {
        self.chooser = chooser;
        self
    }

    pub async fn create_document(&self, url: impl Into<String>) -> DomainResult<Document> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "document url cannot be empty".to_string(),
            ));
        }
        let document = Document::new(url);
        self.document_repo.create(&document).await?;
        info!(doc_id = %document.id, url = %document.url, "document created");
        Ok(document)
    }

    pub async fn get_document(&self, id: Uuid) -> DomainResult<Document> {
        self.document_repo
            .get(id)
            .await?
            .ok_or(DomainError::DocumentNotFound(id))
    }

    pub async fn list_documents(&self) -> DomainResult<Vec<Document>> {
        self.document_repo.list().await
    }

    /// Create a task serving a document directly.
    pub async fn create_root_task(
        &self,
        task_type: &str,
        params: Value,
        doc_id: Uuid,
        priority: Option<f64>,
    ) -> DomainResult<Task> {
        self.get_document(doc_id).await?;
        let mut task = Task::new(task_type, params, doc_id);
        if let Some(priority) = priority {
            task = task.with_priority(priority);
        }
        self.insert(task).await
    }

    /// Create a task under an existing parent, on the parent's document.
    pub async fn create_child_task(
        &self,
        parent_id: Uuid,
        task_type: &str,
        params: Value,
        priority: Option<f64>,
    ) -> DomainResult<Task> {
        let parent = self.get_task(parent_id).await?;
        let mut task = Task::new(task_type, params, parent.doc_id).with_parent(parent.id);
        if let Some(priority) = priority {
            task = task.with_priority(priority);
        }
        self.insert(task).await
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<Task> {
        self.task_repo
            .get(id)
            .await?
            .ok_or(DomainError::TaskNotFound(id))
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        self.task_repo.list(filter).await
    }

    /// Pick an open task for a user: a random one among the highest-priority
    /// open tasks, optionally restricted to a document.
    pub async fn choose_task(&self, doc_id: Option<Uuid>) -> DomainResult<Task> {
        let candidates = self
            .task_repo
            .list(TaskFilter {
                state: Some(TaskState::Open),
                doc_id,
                limit: Some(self.chooser.window.max(1)),
                ..Default::default()
            })
            .await?;

        let chosen = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(DomainError::NoTasksLeft)?;
        debug!(task_id = %chosen.id, candidates = candidates.len(), "task chosen");
        Ok(chosen)
    }

    async fn insert(&self, task: Task) -> DomainResult<Task> {
        if !self.registry.contains(&task.task_type) {
            return Err(DomainError::UnknownTaskType(task.task_type));
        }
        task.validate().map_err(DomainError::ValidationFailed)?;

        if let Some(existing) = self
            .task_repo
            .find_by_type_and_params(&task.task_type, &task.params)
            .await?
        {
            return Err(DomainError::DuplicateTask {
                task_type: task.task_type,
                existing: existing.id,
            });
        }

        self.task_repo.create(&task).await?;
        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            parent_id = ?task.parent_id,
            "task created"
        );
        Ok(task)
    }
}
