//! Task types declared in configuration.
//!
//! A declarative task type keeps its verified value on the task itself and
//! derives follow-up tasks from fields of that value:
//!
//! ```yaml
//! task_types:
//!   - name: find_table
//!     average_subtasks_count: 12
//!     children:
//!       - task_type: transcribe_row
//!         from_field: rows
//!   - name: transcribe_row
//!     unanimous_fields: [amount]
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ChildTask, Task, TaskTypeConfig, Value};
use crate::domain::ports::{ReconcilerOverrides, TaskType};
use crate::services::reconciliation::UnanimousReconciler;

#[derive(Debug, Clone)]
pub struct DeclarativeTaskType {
    config: TaskTypeConfig,
}

impl DeclarativeTaskType {
    pub fn new(config: TaskTypeConfig) -> Self {
        Self { config }
    }

    fn child_params(task: &Task, index: usize, value: &Value) -> Value {
        Value::record([
            ("parent", Value::from(task.id.to_string())),
            ("index", Value::from(index as i64)),
            ("value", value.clone()),
        ])
    }
}

#[async_trait]
impl TaskType for DeclarativeTaskType {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn save_verified_data(&self, task: &Task, _value: &Value) -> DomainResult<()> {
        // The value is committed on the task row; nothing else to write.
        debug!(task_id = %task.id, task_type = %self.config.name, "verified value kept on task");
        Ok(())
    }

    async fn after_save(&self, task: &Task, value: &Value) -> DomainResult<Vec<ChildTask>> {
        let mut children = Vec::new();

        for rule in &self.config.children {
            let Some(field) = value.get_path(&rule.from_field) else {
                debug!(
                    task_id = %task.id,
                    field = %rule.from_field,
                    "child rule field absent from verified value"
                );
                continue;
            };

            match field {
                Value::Sequence(items) => {
                    children.extend(items.iter().enumerate().map(|(i, item)| {
                        ChildTask::new(&rule.task_type, Self::child_params(task, i, item))
                    }));
                }
                Value::Record(_) => {
                    children.push(ChildTask::new(
                        &rule.task_type,
                        Self::child_params(task, 0, field),
                    ));
                }
                Value::Scalar(_) => {
                    debug!(
                        task_id = %task.id,
                        field = %rule.from_field,
                        "child rule field is a scalar, no children spawned"
                    );
                }
            }
        }

        Ok(children)
    }

    fn average_subtasks_count(&self) -> f64 {
        self.config.average_subtasks_count
    }

    fn overrides(&self) -> ReconcilerOverrides {
        let mut overrides = ReconcilerOverrides::new();
        for path in &self.config.unanimous_fields {
            overrides.insert(path.clone(), Arc::new(UnanimousReconciler));
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ChildRuleConfig;
    use serde_json::json;
    use uuid::Uuid;

    fn table_type() -> DeclarativeTaskType {
        DeclarativeTaskType::new(TaskTypeConfig {
            name: "find_table".to_string(),
            average_subtasks_count: 12.0,
            children: vec![
                ChildRuleConfig {
                    task_type: "transcribe_row".to_string(),
                    from_field: "rows".to_string(),
                },
                ChildRuleConfig {
                    task_type: "transcribe_header".to_string(),
                    from_field: "header".to_string(),
                },
            ],
            unanimous_fields: vec!["title".to_string()],
        })
    }

    #[tokio::test]
    async fn test_children_from_sequence_and_record() {
        let task_type = table_type();
        let task = Task::new("find_table", Value::default(), Uuid::new_v4());
        let value = Value::from(json!({
            "rows": [{"y": 10}, {"y": 20}],
            "header": {"y": 0}
        }));

        let children = task_type.after_save(&task, &value).await.unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].task_type, "transcribe_row");
        assert_eq!(
            children[1].params.get_path("value.y"),
            Some(&Value::from(20))
        );
        assert_eq!(children[2].task_type, "transcribe_header");
    }

    #[tokio::test]
    async fn test_missing_field_spawns_nothing() {
        let task = Task::new("find_table", Value::default(), Uuid::new_v4());
        let children = table_type()
            .after_save(&task, &Value::from(json!({"other": 1})))
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn test_overrides_and_estimate() {
        let task_type = table_type();
        assert_eq!(task_type.average_subtasks_count(), 12.0);
        let overrides = task_type.overrides();
        assert!(overrides.get("title").is_some());
        assert!(overrides.get("rows").is_none());
    }
}
