//! Registry of task types by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::TaskTypeConfig;
use crate::domain::ports::TaskType;
use crate::services::declarative_task_type::DeclarativeTaskType;

/// Explicit registry mapping task type names to implementations.
///
/// Built once at startup and shared by the services that need to look up
/// hooks for a task.
#[derive(Clone, Default)]
pub struct TaskTypeRegistry {
    types: HashMap<String, Arc<dyn TaskType>>,
}

impl TaskTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task type, replacing any previous one with the same name.
    pub fn register(&mut self, task_type: Arc<dyn TaskType>) {
        self.types.insert(task_type.name().to_string(), task_type);
    }

    /// Registry of the task types declared in configuration.
    pub fn from_config(task_types: &[TaskTypeConfig]) -> Self {
        let mut registry = Self::new();
        for config in task_types {
            registry.register(Arc::new(DeclarativeTaskType::new(config.clone())));
        }
        registry
    }

    pub fn with(mut self, task_type: Arc<dyn TaskType>) -> Self {
        self.register(task_type);
        self
    }

    pub fn get(&self, name: &str) -> DomainResult<Arc<dyn TaskType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::UnknownTaskType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TaskTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskTypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
