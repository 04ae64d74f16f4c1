//! Task type capability interface.
//!
//! A task type owns everything domain-specific about a kind of task: where its
//! verified data goes, which follow-up tasks it produces, how many children it
//! usually has and how individual fields are reconciled.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ChildTask, Reconciled, Task, Value};

/// Reconciles the values gathered for one field path, replacing the automatic
/// shape-based dispatch.
pub trait FieldReconciler: Send + Sync {
    fn reconcile(&self, values: &[&Value]) -> DomainResult<Reconciled>;
}

impl<F> FieldReconciler for F
where
    F: Fn(&[&Value]) -> DomainResult<Reconciled> + Send + Sync,
{
    fn reconcile(&self, values: &[&Value]) -> DomainResult<Reconciled> {
        self(values)
    }
}

/// Per-field reconciler overrides keyed by dotted field path.
///
/// Paths name record keys from the payload root (`"cars.model"`); elements of
/// a sequence share the path of the sequence field.
#[derive(Clone, Default)]
pub struct ReconcilerOverrides {
    by_path: HashMap<String, Arc<dyn FieldReconciler>>,
}

impl ReconcilerOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reconciler for a field path.
    pub fn with(mut self, path: impl Into<String>, reconciler: impl FieldReconciler + 'static) -> Self {
        self.by_path.insert(path.into(), Arc::new(reconciler));
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, reconciler: Arc<dyn FieldReconciler>) {
        self.by_path.insert(path.into(), reconciler);
    }

    pub fn get(&self, path: &str) -> Option<&Arc<dyn FieldReconciler>> {
        self.by_path.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

impl fmt::Debug for ReconcilerOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.by_path.keys().collect();
        paths.sort();
        f.debug_struct("ReconcilerOverrides")
            .field("paths", &paths)
            .finish()
    }
}

/// Behavior of one kind of task, supplied by application code.
#[async_trait]
pub trait TaskType: Send + Sync {
    /// Registry name; matches [`Task::task_type`].
    fn name(&self) -> &str;

    /// Commit the verified value to the application's domain schema.
    async fn save_verified_data(&self, task: &Task, value: &Value) -> DomainResult<()>;

    /// Produce follow-up tasks for the verified value.
    async fn after_save(&self, task: &Task, value: &Value) -> DomainResult<Vec<ChildTask>>;

    /// Undo `save_verified_data` when a later step of the same commit failed.
    async fn discard_verified_data(&self, _task: &Task, _value: &Value) -> DomainResult<()> {
        Ok(())
    }

    /// Expected number of child tasks, used before the real children exist.
    fn average_subtasks_count(&self) -> f64 {
        0.0
    }

    /// Per-field reconciler overrides.
    fn overrides(&self) -> ReconcilerOverrides {
        ReconcilerOverrides::default()
    }
}
