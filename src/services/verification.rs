//! Verification policy: decides when a task's entries agree enough to commit.
//!
//! Every operation holds the task's lock for its whole
//! read-reconcile-decide-commit sequence, so two concurrent submissions for
//! the same task can never both verify it.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Decision, Entry, Outcome, Task, TaskState, Value, VerificationConfig,
};
use crate::domain::ports::{DocumentRepository, EntryRepository, TaskRepository, TaskType};
use crate::services::keyed_locks::KeyedLocks;
use crate::services::progress::{own_progress, ProgressAggregator, COMPLETE};
use crate::services::reconciliation::reconcile_payloads;
use crate::services::task_type_registry::TaskTypeRegistry;

/// Service applying the crosscheck policy to tasks.
pub struct VerificationService<T, E, D>
where
    T: TaskRepository,
    E: EntryRepository,
    D: DocumentRepository,
{
    task_repo: Arc<T>,
    entry_repo: Arc<E>,
    registry: Arc<TaskTypeRegistry>,
    aggregator: ProgressAggregator<T, D>,
    locks: KeyedLocks,
    config: VerificationConfig,
}

impl<T, E, D> VerificationService<T, E, D>
where
    T: TaskRepository,
    E: EntryRepository,
    D: DocumentRepository,
{
    pub fn new(
        task_repo: Arc<T>,
        entry_repo: Arc<E>,
        document_repo: Arc<D>,
        registry: Arc<TaskTypeRegistry>,
        config: VerificationConfig,
    ) -> Self {
        let locks = KeyedLocks::new();
        let aggregator = ProgressAggregator::new(
            Arc::clone(&task_repo),
            document_repo,
            Arc::clone(&registry),
            locks.clone(),
        );
        Self {
            task_repo,
            entry_repo,
            registry,
            aggregator,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Decide on a task given all of its entries.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn evaluate(&self, task_id: Uuid, entries: &[Entry]) -> DomainResult<Decision> {
        let _guard = self.locks.lock(task_id).await;
        self.evaluate_locked(task_id, entries).await
    }

    /// Store a user's entry and evaluate the task with it.
    #[instrument(skip(self, payload))]
    pub async fn submit_entry(
        &self,
        task_id: Uuid,
        user_id: Option<Uuid>,
        payload: Value,
    ) -> DomainResult<(Entry, Decision)> {
        let _guard = self.locks.lock(task_id).await;

        let task = self.load_task(task_id).await?;
        if task.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: task.state.to_string(),
                to: task.state.to_string(),
                reason: "task no longer accepts entries".to_string(),
            });
        }

        // Refuse, unstored, a payload that cannot be reconciled with the stored ones.
        let task_type = self.registry.get(&task.task_type)?;
        let mut entries = self.entry_repo.list_for_task(task_id).await?;
        reconcile_payloads(
            entries.iter().map(|e| &e.payload).chain(std::iter::once(&payload)),
            &task_type.overrides(),
        )?;

        let entry = Entry::new(task_id, user_id, payload);
        self.entry_repo.create(&entry).await?;
        debug!(task_id = %task_id, entry_id = %entry.id, "entry stored");

        entries.push(entry.clone());
        let decision = self.evaluate_locked(task_id, &entries).await?;
        Ok((entry, decision))
    }

    /// Moderator override: commit one entry's payload as the task's value.
    #[instrument(skip(self))]
    pub async fn force_verify(&self, task_id: Uuid, entry_id: Uuid) -> DomainResult<Task> {
        let _guard = self.locks.lock(task_id).await;

        let mut task = self.load_task(task_id).await?;
        let entry = self
            .entry_repo
            .get(entry_id)
            .await?
            .ok_or(DomainError::EntryNotFound(entry_id))?;
        if entry.task_id != task_id {
            return Err(DomainError::InvalidInput(format!(
                "entry {entry_id} belongs to task {}, not {task_id}",
                entry.task_id
            )));
        }
        if !task.can_transition_to(TaskState::ClosedManually) {
            return Err(DomainError::InvalidStateTransition {
                from: task.state.to_string(),
                to: TaskState::ClosedManually.to_string(),
                reason: "task is already closed".to_string(),
            });
        }

        let task_type = self.registry.get(&task.task_type)?;
        self.commit_verified(&mut task, task_type.as_ref(), entry.payload, TaskState::ClosedManually)
            .await?;

        info!(task_id = %task_id, entry_id = %entry_id, "task closed manually");
        Ok(task)
    }

    /// Refresh progress after an entry was stored elsewhere, without
    /// reconciling.
    #[instrument(skip(self))]
    pub async fn record_new_entry_effects(&self, task_id: Uuid) -> DomainResult<Task> {
        let _guard = self.locks.lock(task_id).await;

        let mut task = self.load_task(task_id).await?;
        if task.is_terminal() {
            debug!(task_id = %task_id, state = %task.state, "terminal task, progress unchanged");
            return Ok(task);
        }

        let count = self.entry_repo.count_for_task(task_id).await?;
        task.own_progress = own_progress(count, self.config.min_entries_to_crosscheck);
        self.aggregator.propagate(&mut task).await?;
        Ok(task)
    }

    async fn evaluate_locked(&self, task_id: Uuid, entries: &[Entry]) -> DomainResult<Decision> {
        let mut task = self.load_task(task_id).await?;
        let count = entries.len();

        if task.is_terminal() {
            warn!(task_id = %task_id, state = %task.state, "evaluate called on closed task");
            return Ok(Decision {
                outcome: Outcome::AlreadyClosed,
                confidence: None,
                entry_count: count,
            });
        }

        if let Some(stray) = entries.iter().find(|e| e.task_id != task_id) {
            return Err(DomainError::InvalidInput(format!(
                "entry {} belongs to task {}, not {task_id}",
                stray.id, stray.task_id
            )));
        }

        let task_type = self.registry.get(&task.task_type)?;

        if count < self.config.min_entries_to_crosscheck {
            self.settle_unverified(&mut task, count, None).await?;
            return Ok(Decision::collecting(count, None));
        }

        let reconciled =
            reconcile_payloads(entries.iter().map(|e| &e.payload), &task_type.overrides())?;
        let confidence = reconciled.confidence;
        debug!(task_id = %task_id, confidence, entries = count, "entries reconciled");

        if confidence >= self.config.min_confidence {
            self.commit_verified(&mut task, task_type.as_ref(), reconciled.value, TaskState::Checked)
                .await?;
            info!(task_id = %task_id, confidence, entries = count, "task verified");
            return Ok(Decision {
                outcome: Outcome::Verified,
                confidence: Some(confidence),
                entry_count: count,
            });
        }

        if count >= self.config.min_entries_to_mark_dirty {
            self.settle_unverified(&mut task, count, Some(TaskState::Dirty)).await?;
            warn!(task_id = %task_id, confidence, entries = count, "entries disagree, task marked dirty");
            return Ok(Decision {
                outcome: Outcome::Dirty,
                confidence: Some(confidence),
                entry_count: count,
            });
        }

        self.settle_unverified(&mut task, count, None).await?;
        Ok(Decision::collecting(count, Some(confidence)))
    }

    /// Persist an unverified task's new own progress, and state if given,
    /// then propagate.
    async fn settle_unverified(
        &self,
        task: &mut Task,
        entry_count: usize,
        state: Option<TaskState>,
    ) -> DomainResult<()> {
        if let Some(state) = state {
            transition(task, state)?;
        }
        task.own_progress = own_progress(entry_count, self.config.min_entries_to_crosscheck);
        self.aggregator.propagate(task).await?;
        Ok(())
    }

    /// Run the task type's hooks and commit the task as verified together
    /// with its follow-up tasks. `save_verified_data` is compensated if a later
    /// step fails.
    async fn commit_verified(
        &self,
        task: &mut Task,
        task_type: &dyn TaskType,
        value: Value,
        state: TaskState,
    ) -> DomainResult<()> {
        let mut verified = task.clone();
        transition(&mut verified, state)?;
        verified.own_progress = COMPLETE;
        verified.verified_data = Some(value.clone());

        task_type
            .save_verified_data(task, &value)
            .await
            .map_err(|e| hook_failure("save_verified_data", e))?;

        let children = match self.spawn_children(task, task_type, &value).await {
            Ok(children) => children,
            Err(e) => {
                self.compensate(task_type, task, &value).await;
                return Err(hook_failure("after_save", e));
            }
        };

        if let Err(e) = self.task_repo.commit_verification(&verified, &children).await {
            self.compensate(task_type, task, &value).await;
            return Err(DomainError::CommitFailure(format!(
                "storing verified task {}: {e}",
                task.id
            )));
        }
        verified.version += 1;
        *task = verified;

        if !children.is_empty() {
            info!(task_id = %task.id, children = children.len(), "follow-up tasks created");
        }

        self.aggregator.propagate(task).await?;
        Ok(())
    }

    async fn spawn_children(
        &self,
        task: &Task,
        task_type: &dyn TaskType,
        value: &Value,
    ) -> DomainResult<Vec<Task>> {
        let children = task_type.after_save(task, value).await?;
        children
            .into_iter()
            .map(|child| {
                if self.registry.contains(&child.task_type) {
                    Ok(child.into_task(task))
                } else {
                    Err(DomainError::UnknownTaskType(child.task_type))
                }
            })
            .collect()
    }

    async fn compensate(&self, task_type: &dyn TaskType, task: &Task, value: &Value) {
        if let Err(e) = task_type.discard_verified_data(task, value).await {
            warn!(task_id = %task.id, error = %e, "failed to discard verified data");
        }
    }

    async fn load_task(&self, task_id: Uuid) -> DomainResult<Task> {
        self.task_repo
            .get(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))
    }
}

fn transition(task: &mut Task, state: TaskState) -> DomainResult<()> {
    let from = task.state;
    task.transition_to(state)
        .map_err(|reason| DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: state.to_string(),
            reason,
        })
}

fn hook_failure(hook: &str, error: DomainError) -> DomainError {
    match error {
        DomainError::CommitFailure(_) => error,
        other => DomainError::CommitFailure(format!("{hook}: {other}")),
    }
}
