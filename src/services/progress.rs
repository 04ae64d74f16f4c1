//! Progress estimation and propagation.
//!
//! Each task carries an own progress (how close its own entries are to
//! verification) and a total progress that blends in its descendants. After a
//! task changes, [`ProgressAggregator::propagate`] recomputes totals up the
//! parent chain and refreshes the document's aggregate.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Task;
use crate::domain::ports::{DocumentRepository, TaskRepository};
use crate::services::keyed_locks::KeyedLocks;
use crate::services::task_type_registry::TaskTypeRegistry;

/// Own progress reported once a task is verified or closed.
pub const COMPLETE: f64 = 100.0;

/// Estimated own progress of an unverified task.
///
/// Approaches 95 as entries accumulate. The curve is taken literally: two
/// entries against a crosscheck minimum of three give `95 * (1 - e^(-4/3))`,
/// about 69.96, not the ~61.9 sometimes quoted for that case.
pub fn own_progress(entry_count: usize, min_entries_to_crosscheck: usize) -> f64 {
    let min = min_entries_to_crosscheck.max(1) as f64;
    95.0 * (1.0 - (-2.0 * entry_count as f64 / min).exp())
}

/// Total progress of a task from its own progress and its children's totals.
///
/// Until the task itself is complete its children are only estimated through
/// `average_subtasks`; afterwards the real children count.
pub fn total_progress(own: f64, average_subtasks: f64, children_totals: &[f64]) -> f64 {
    let total = if own < COMPLETE {
        own / (average_subtasks.max(0.0) + 1.0)
    } else {
        let count = children_totals.len() as f64;
        let sum: f64 = children_totals.iter().sum();
        (sum + COMPLETE) / (count + 1.0)
    };
    total.clamp(0.0, COMPLETE)
}

/// Walks the task tree upward, persisting totals, and refreshes the
/// document's progress.
pub struct ProgressAggregator<T: TaskRepository, D: DocumentRepository> {
    task_repo: Arc<T>,
    document_repo: Arc<D>,
    registry: Arc<TaskTypeRegistry>,
    locks: KeyedLocks,
}

impl<T: TaskRepository, D: DocumentRepository> ProgressAggregator<T, D> {
    pub fn new(
        task_repo: Arc<T>,
        document_repo: Arc<D>,
        registry: Arc<TaskTypeRegistry>,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            task_repo,
            document_repo,
            registry,
            locks,
        }
    }

    /// Recompute and persist totals from `task` up to its root, then the
    /// document progress. Returns the new document progress.
    ///
    /// The caller must hold `task`'s lock; every ancestor is locked and
    /// re-read here before it is written.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn propagate(&self, task: &mut Task) -> DomainResult<f64> {
        self.refresh_total(task).await?;
        self.task_repo.save(task).await?;

        let mut chain = vec![task.id];
        let mut seen: HashSet<Uuid> = HashSet::from([task.id]);
        let mut next = task.parent_id;

        while let Some(parent_id) = next {
            chain.push(parent_id);
            if !seen.insert(parent_id) {
                return Err(DomainError::ParentCycle(chain));
            }

            let _guard = self.locks.lock(parent_id).await;
            let mut parent = self
                .task_repo
                .get(parent_id)
                .await?
                .ok_or(DomainError::TaskNotFound(parent_id))?;
            self.refresh_total(&mut parent).await?;
            self.task_repo.save(&mut parent).await?;

            debug!(
                task_id = %parent.id,
                total_progress = parent.total_progress,
                "ancestor progress updated"
            );
            next = parent.parent_id;
        }

        self.refresh_document(task.doc_id).await
    }

    /// Recompute a document's progress as the mean total of its root tasks.
    pub async fn refresh_document(&self, doc_id: Uuid) -> DomainResult<f64> {
        let _guard = self.locks.lock(doc_id).await;

        let roots = self.task_repo.get_root_tasks(doc_id).await?;
        let progress = if roots.is_empty() {
            0.0
        } else {
            roots.iter().map(|t| t.total_progress).sum::<f64>() / roots.len() as f64
        };

        self.document_repo.update_progress(doc_id, progress).await?;
        debug!(doc_id = %doc_id, roots = roots.len(), progress, "document progress updated");
        Ok(progress)
    }

    async fn refresh_total(&self, task: &mut Task) -> DomainResult<()> {
        let average = self.registry.get(&task.task_type)?.average_subtasks_count();
        let children_totals: Vec<f64> = if task.own_progress >= COMPLETE {
            self.task_repo
                .get_children(task.id)
                .await?
                .iter()
                .map(|c| c.total_progress)
                .collect()
        } else {
            Vec::new()
        };
        task.total_progress = total_progress(task.own_progress, average, &children_totals);
        Ok(())
    }
}
