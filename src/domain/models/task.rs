//! Task domain model.
//!
//! Tasks are units of crowdsourced work. They form a tree: a task may spawn
//! child tasks once its own data has been verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Value;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Awaiting entries
    #[default]
    Open,
    /// Enough entries exist but they disagree; needs more entries or moderation
    Dirty,
    /// Reconciliation succeeded and the data was committed
    Checked,
    /// A moderator closed the task with a chosen entry
    ClosedManually,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Dirty => "dirty",
            Self::Checked => "checked",
            Self::ClosedManually => "manual",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "dirty" => Some(Self::Dirty),
            "checked" | "crosschecked" => Some(Self::Checked),
            "manual" | "closed_manually" => Some(Self::ClosedManually),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Checked | Self::ClosedManually)
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(&self) -> Vec<TaskState> {
        match self {
            Self::Open => vec![Self::Dirty, Self::Checked, Self::ClosedManually],
            Self::Dirty => vec![Self::Dirty, Self::Checked, Self::ClosedManually],
            Self::Checked | Self::ClosedManually => vec![],
        }
    }

    pub fn can_transition_to(&self, new_state: Self) -> bool {
        self.valid_transitions().contains(&new_state)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work that users submit entries for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: Uuid,
    /// Task type name, resolved through the task type registry
    pub task_type: String,
    /// Inputs needed to present the task (e.g. source document URL, page)
    pub params: Value,
    /// Document this task ultimately serves
    pub doc_id: Uuid,
    /// Parent task (None for root tasks)
    pub parent_id: Option<Uuid>,
    /// Priority used by the task chooser, 0.0 - 1.0
    pub priority: f64,
    /// Estimated completion of this task alone, 0 - 100
    pub own_progress: f64,
    /// Own progress blended with all descendants, 0 - 100
    pub total_progress: f64,
    /// Current state
    pub state: TaskState,
    /// Value committed by verification
    pub verified_data: Option<Value>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
    /// Version for optimistic locking
    pub version: u64,
}

impl Task {
    /// Create a new root task for a document.
    pub fn new(task_type: impl Into<String>, params: Value, doc_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            params,
            doc_id,
            parent_id: None,
            priority: 1.0,
            own_progress: 0.0,
            total_progress: 0.0,
            state: TaskState::default(),
            verified_data: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Set parent task.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if task is terminal.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if can transition to given state.
    pub fn can_transition_to(&self, new_state: TaskState) -> bool {
        self.state.can_transition_to(new_state)
    }

    /// Transition to new state.
    pub fn transition_to(&mut self, new_state: TaskState) -> Result<(), String> {
        if !self.can_transition_to(new_state) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.state.as_str(),
                new_state.as_str()
            ));
        }

        self.state = new_state;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate task.
    pub fn validate(&self) -> Result<(), String> {
        if self.task_type.trim().is_empty() {
            return Err("Task type cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.priority) {
            return Err(format!("Task priority {} must be between 0 and 1", self.priority));
        }
        if self.parent_id == Some(self.id) {
            return Err("Task cannot be its own parent".to_string());
        }
        if !(0.0..=100.0).contains(&self.own_progress)
            || !(0.0..=100.0).contains(&self.total_progress)
        {
            return Err("Task progress must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

/// Description of a follow-up task produced by a task type after its data
/// was verified. The engine fills in parent and document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildTask {
    pub task_type: String,
    pub params: Value,
    #[serde(default = "default_child_priority")]
    pub priority: f64,
}

fn default_child_priority() -> f64 {
    1.0
}

impl ChildTask {
    pub fn new(task_type: impl Into<String>, params: Value) -> Self {
        Self {
            task_type: task_type.into(),
            params,
            priority: default_child_priority(),
        }
    }

    /// Materialize as a task under the given parent.
    pub fn into_task(self, parent: &Task) -> Task {
        Task::new(self.task_type, self.params, parent.doc_id)
            .with_parent(parent.id)
            .with_priority(self.priority)
    }
}
