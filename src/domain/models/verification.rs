//! Reconciliation results and verification decisions.

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Outcome of reconciling a list of values: the trusted value plus how much
/// the inputs agreed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciled {
    pub value: Value,
    /// Agreement in [0, 1]
    pub confidence: f64,
}

impl Reconciled {
    pub fn new(value: Value, confidence: f64) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Unanimous result.
    pub fn certain(value: Value) -> Self {
        Self::new(value, 1.0)
    }
}

/// What a verification pass did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Not enough agreement or entries yet; task stays open
    Collecting,
    /// Data was reconciled and committed
    Verified,
    /// Entries disagree and the task needs moderation
    Dirty,
    /// Task was already checked or closed; nothing changed
    AlreadyClosed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Verified => "verified",
            Self::Dirty => "dirty",
            Self::AlreadyClosed => "already_closed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a task's entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    /// Confidence of the reconciliation, if one was attempted
    pub confidence: Option<f64>,
    pub entry_count: usize,
}

impl Decision {
    pub fn collecting(entry_count: usize, confidence: Option<f64>) -> Self {
        Self {
            outcome: Outcome::Collecting,
            confidence,
            entry_count,
        }
    }

    pub fn verified(&self) -> bool {
        self.outcome == Outcome::Verified
    }
}
