//! Entry and document models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Value;

/// One user's submission for one task. Never edited, only added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub task_id: Uuid,
    /// Submitting user; None for anonymous submissions
    pub user_id: Option<Uuid>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(task_id: Uuid, user_id: Option<Uuid>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            user_id,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Anonymous entry.
    pub fn anonymous(task_id: Uuid, payload: Value) -> Self {
        Self::new(task_id, None, payload)
    }
}

/// The object being digitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub url: String,
    /// Average total progress of the document's root tasks, 0 - 100
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            progress: 0.0,
            created_at: Utc::now(),
        }
    }
}
