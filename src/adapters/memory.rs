//! In-memory implementations of the storage ports.
//!
//! Used by tests and by embedders that do not need persistence. Semantics match
//! the SQLite adapters: optimistic versioning, `(task_type, params)` and
//! `(task_id, user_id)` uniqueness, atomic verification commits.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Document, Entry, Task, Value};
use crate::domain::ports::{DocumentRepository, EntryRepository, TaskFilter, TaskRepository};

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(tasks: &HashMap<Uuid, Task>, task: &Task) -> DomainResult<()> {
    if tasks.contains_key(&task.id) {
        return Err(DomainError::ValidationFailed(format!(
            "task {} already exists",
            task.id
        )));
    }
    if let Some(existing) = tasks
        .values()
        .find(|t| t.task_type == task.task_type && t.params == task.params)
    {
        return Err(DomainError::DuplicateTask {
            task_type: task.task_type.clone(),
            existing: existing.id,
        });
    }
    Ok(())
}

fn check_version(tasks: &HashMap<Uuid, Task>, task: &Task) -> DomainResult<()> {
    let stored = tasks.get(&task.id).ok_or(DomainError::TaskNotFound(task.id))?;
    if stored.version != task.version {
        return Err(DomainError::ConcurrencyConflict {
            entity: "Task".to_string(),
            id: task.id.to_string(),
        });
    }
    Ok(())
}

fn by_priority(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        check_unique(&tasks, task)?;
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        check_version(&tasks, task)?;
        let mut stored = task.clone();
        stored.version += 1;
        tasks.insert(task.id, stored);
        Ok(())
    }

    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut children: Vec<Task> = tasks
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(children)
    }

    async fn get_root_tasks(&self, doc_id: Uuid) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut roots: Vec<Task> = tasks
            .values()
            .filter(|t| t.doc_id == doc_id && t.is_root())
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(roots)
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut result: Vec<Task> = tasks
            .values()
            .filter(|t| filter.state.is_none_or(|s| t.state == s))
            .filter(|t| filter.doc_id.is_none_or(|d| t.doc_id == d))
            .filter(|t| filter.parent_id.is_none_or(|p| t.parent_id == Some(p)))
            .filter(|t| filter.task_type.as_ref().is_none_or(|ty| t.task_type == **ty))
            .filter(|t| !filter.roots_only || t.is_root())
            .cloned()
            .collect();
        by_priority(&mut result);
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    async fn find_by_type_and_params(
        &self,
        task_type: &str,
        params: &Value,
    ) -> DomainResult<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .find(|t| t.task_type == task_type && &t.params == params)
            .cloned())
    }

    async fn commit_verification(&self, task: &Task, children: &[Task]) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        check_version(&tasks, task)?;

        // Validate every insert against a scratch copy so a failure leaves
        // the store untouched.
        let mut staged = tasks.clone();
        for child in children {
            check_unique(&staged, child)?;
            staged.insert(child.id, child.clone());
        }
        let mut stored = task.clone();
        stored.version += 1;
        staged.insert(task.id, stored);

        *tasks = staged;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntryRepository {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryRepository {
    async fn create(&self, entry: &Entry) -> DomainResult<()> {
        let mut entries = self.entries.write().await;
        if let Some(user_id) = entry.user_id {
            if entries
                .iter()
                .any(|e| e.task_id == entry.task_id && e.user_id == Some(user_id))
            {
                return Err(DomainError::DuplicateEntry {
                    task_id: entry.task_id,
                    user_id,
                });
            }
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Entry>> {
        Ok(self.entries.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<Entry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn count_for_task(&self, task_id: Uuid) -> DomainResult<usize> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.task_id == task_id)
            .count())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, document: &Document) -> DomainResult<()> {
        let mut documents = self.documents.write().await;
        if documents.iter().any(|d| d.id == document.id) {
            return Err(DomainError::ValidationFailed(format!(
                "document {} already exists",
                document.id
            )));
        }
        documents.push(document.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>> {
        Ok(self.documents.read().await.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Document>> {
        Ok(self.documents.read().await.clone())
    }

    async fn update_progress(&self, id: Uuid, progress: f64) -> DomainResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(DomainError::DocumentNotFound(id))?;
        document.progress = progress;
        Ok(())
    }
}
