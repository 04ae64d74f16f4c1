//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{is_unique_violation, parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Task, TaskState, Value};
use crate::domain::ports::{TaskFilter, TaskRepository};

const SELECT_TASK: &str = "SELECT id, task_type, params, doc_id, parent_id, priority, \
     own_progress, total_progress, state, verified_data, version, created_at, updated_at \
     FROM tasks";

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Map a failed insert to `DuplicateTask` when the row clashes on
    /// `(task_type, params)`.
    async fn insert_error(&self, task: &Task, err: sqlx::Error) -> DomainError {
        if !is_unique_violation(&err) {
            return err.into();
        }
        match self.find_by_type_and_params(&task.task_type, &task.params).await {
            Ok(Some(existing)) => DomainError::DuplicateTask {
                task_type: task.task_type.clone(),
                existing: existing.id,
            },
            Ok(None) => DomainError::ValidationFailed(format!("task {} already exists", task.id)),
            Err(e) => e,
        }
    }

    /// Distinguish a stale version from a missing row after an update
    /// matched nothing.
    async fn update_miss(&self, task: &Task) -> DomainError {
        match self.get(task.id).await {
            Ok(Some(_)) => DomainError::ConcurrencyConflict {
                entity: "Task".to_string(),
                id: task.id.to_string(),
            },
            Ok(None) => DomainError::TaskNotFound(task.id),
            Err(e) => e,
        }
    }

    async fn fetch(&self, sql: &str, binds: &[String]) -> DomainResult<Vec<Task>> {
        let mut query = sqlx::query_as::<_, TaskRow>(sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Task::try_from).collect()
    }
}

async fn insert_task(conn: &mut SqliteConnection, task: &Task) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO tasks (id, task_type, params, doc_id, parent_id, priority,
           own_progress, total_progress, state, verified_data, version, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(task.id.to_string())
    .bind(&task.task_type)
    .bind(task.params.to_string())
    .bind(task.doc_id.to_string())
    .bind(task.parent_id.map(|id| id.to_string()))
    .bind(task.priority)
    .bind(task.own_progress)
    .bind(task.total_progress)
    .bind(task.state.as_str())
    .bind(task.verified_data.as_ref().map(Value::to_string))
    .bind(task.version as i64)
    .bind(task.created_at.to_rfc3339())
    .bind(task.updated_at.to_rfc3339())
    .execute(conn)
    .await?;
    Ok(())
}

/// Version-checked update; returns whether a row matched.
async fn update_task(conn: &mut SqliteConnection, task: &Task) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE tasks SET task_type = ?, params = ?, parent_id = ?, priority = ?,
           own_progress = ?, total_progress = ?, state = ?, verified_data = ?,
           version = version + 1, updated_at = ?
           WHERE id = ? AND version = ?"#,
    )
    .bind(&task.task_type)
    .bind(task.params.to_string())
    .bind(task.parent_id.map(|id| id.to_string()))
    .bind(task.priority)
    .bind(task.own_progress)
    .bind(task.total_progress)
    .bind(task.state.as_str())
    .bind(task.verified_data.as_ref().map(Value::to_string))
    .bind(task.updated_at.to_rfc3339())
    .bind(task.id.to_string())
    .bind(task.version as i64)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        let inserted = insert_task(&mut conn, task).await;
        drop(conn);
        match inserted {
            Ok(()) => Ok(()),
            Err(e) => Err(self.insert_error(task, e).await),
        }
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("{SELECT_TASK} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let mut conn = self.pool.acquire().await?;
        let matched = update_task(&mut conn, task).await?;
        drop(conn);
        if matched {
            Ok(())
        } else {
            Err(self.update_miss(task).await)
        }
    }

    async fn get_children(&self, parent_id: Uuid) -> DomainResult<Vec<Task>> {
        self.fetch(
            &format!("{SELECT_TASK} WHERE parent_id = ? ORDER BY rowid"),
            &[parent_id.to_string()],
        )
        .await
    }

    async fn get_root_tasks(&self, doc_id: Uuid) -> DomainResult<Vec<Task>> {
        self.fetch(
            &format!("{SELECT_TASK} WHERE doc_id = ? AND parent_id IS NULL ORDER BY rowid"),
            &[doc_id.to_string()],
        )
        .await
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = format!("{SELECT_TASK} WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(state) = &filter.state {
            query.push_str(" AND state = ?");
            bindings.push(state.as_str().to_string());
        }
        if let Some(doc_id) = &filter.doc_id {
            query.push_str(" AND doc_id = ?");
            bindings.push(doc_id.to_string());
        }
        if let Some(parent_id) = &filter.parent_id {
            query.push_str(" AND parent_id = ?");
            bindings.push(parent_id.to_string());
        }
        if let Some(task_type) = &filter.task_type {
            query.push_str(" AND task_type = ?");
            bindings.push(task_type.clone());
        }
        if filter.roots_only {
            query.push_str(" AND parent_id IS NULL");
        }

        query.push_str(" ORDER BY priority DESC, rowid");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        self.fetch(&query, &bindings).await
    }

    async fn find_by_type_and_params(
        &self,
        task_type: &str,
        params: &Value,
    ) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("{SELECT_TASK} WHERE task_type = ? AND params = ?"))
                .bind(task_type)
                .bind(params.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Task::try_from).transpose()
    }

    async fn commit_verification(&self, task: &Task, children: &[Task]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        if !update_task(&mut tx, task).await? {
            drop(tx);
            return Err(self.update_miss(task).await);
        }

        for child in children {
            if let Err(e) = insert_task(&mut tx, child).await {
                // Rolled back on drop; release the connection before looking up
                // the clash.
                drop(tx);
                return Err(self.insert_error(child, e).await);
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    task_type: String,
    params: String,
    doc_id: String,
    parent_id: Option<String>,
    priority: f64,
    own_progress: f64,
    total_progress: f64,
    state: String,
    verified_data: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let state = TaskState::from_str(&row.state)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid state: {}", row.state)))?;

        let verified_data = row
            .verified_data
            .as_deref()
            .map(Value::from_json_str)
            .transpose()?;

        Ok(Task {
            id: parse_uuid(&row.id)?,
            task_type: row.task_type,
            params: Value::from_json_str(&row.params)?,
            doc_id: parse_uuid(&row.doc_id)?,
            parent_id: parse_optional_uuid(row.parent_id)?,
            priority: row.priority,
            own_progress: row.own_progress,
            total_progress: row.total_progress,
            state,
            verified_data,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            version: row.version as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteDocumentRepository};
    use crate::domain::models::Document;
    use crate::domain::ports::DocumentRepository;
    use serde_json::json;

    async fn setup_test_repo() -> (SqliteTaskRepository, Document) {
        let pool = create_migrated_test_pool().await.unwrap();
        let doc = Document::new("https://example.org/a.pdf");
        SqliteDocumentRepository::new(pool.clone())
            .create(&doc)
            .await
            .unwrap();
        (SqliteTaskRepository::new(pool), doc)
    }

    fn task(doc: &Document, n: i64) -> Task {
        Task::new("find_table", Value::from(json!({"page": n, "scan": "p.png"})), doc.id)
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let (repo, doc) = setup_test_repo().await;
        let mut t = task(&doc, 1).with_priority(0.25);
        t.verified_data = Some(Value::from(json!({"rows": [1.5, null, "x"]})));

        repo.create(&t).await.unwrap();

        let stored = repo.get(t.id).await.unwrap().unwrap();
        assert_eq!(stored.params, t.params);
        assert_eq!(stored.verified_data, t.verified_data);
        assert_eq!(stored.priority, 0.25);
        assert_eq!(stored.state, TaskState::Open);
        assert_eq!(stored.version, 1);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_type_and_params() {
        let (repo, doc) = setup_test_repo().await;
        let first = task(&doc, 1);
        repo.create(&first).await.unwrap();

        let err = repo.create(&task(&doc, 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateTask { existing, .. } if existing == first.id));

        let found = repo
            .find_by_type_and_params("find_table", &first.params)
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_optimistic_update() {
        let (repo, doc) = setup_test_repo().await;
        let mut t = task(&doc, 1);
        repo.create(&t).await.unwrap();
        let stale = t.clone();

        t.own_progress = 42.0;
        repo.save(&mut t).await.unwrap();
        assert_eq!(repo.get(t.id).await.unwrap().unwrap().version, 2);

        let err = repo.update(&stale).await.unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

        let err = repo.update(&task(&doc, 9)).await.unwrap_err();
        assert!(matches!(err, DomainError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_children_roots_and_list() {
        let (repo, doc) = setup_test_repo().await;
        let root = task(&doc, 1).with_priority(0.2);
        repo.create(&root).await.unwrap();
        let child = task(&doc, 2).with_parent(root.id).with_priority(0.9);
        repo.create(&child).await.unwrap();

        assert_eq!(repo.get_children(root.id).await.unwrap()[0].id, child.id);
        let roots = repo.get_root_tasks(doc.id).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, root.id);

        let all = repo.list(TaskFilter::default()).await.unwrap();
        assert_eq!(all[0].id, child.id);

        let only_roots = repo
            .list(TaskFilter {
                roots_only: true,
                state: Some(TaskState::Open),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_roots.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_verification_is_atomic() {
        let (repo, doc) = setup_test_repo().await;
        let existing = task(&doc, 7);
        repo.create(&existing).await.unwrap();
        let parent = task(&doc, 1);
        repo.create(&parent).await.unwrap();

        let mut verified = parent.clone();
        verified.state = TaskState::Checked;
        verified.own_progress = 100.0;
        let fresh = task(&doc, 2).with_parent(parent.id);
        let clash = task(&doc, 7).with_parent(parent.id);

        let err = repo
            .commit_verification(&verified, &[fresh.clone(), clash])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateTask { .. }));
        assert!(repo.get(fresh.id).await.unwrap().is_none());
        assert_eq!(repo.get(parent.id).await.unwrap().unwrap().state, TaskState::Open);

        repo.commit_verification(&verified, &[fresh.clone()]).await.unwrap();
        let stored = repo.get(parent.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TaskState::Checked);
        assert_eq!(stored.version, 2);
        assert!(repo.get(fresh.id).await.unwrap().is_some());
    }
}
