//! SQLite implementation of the EntryRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{is_unique_violation, parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Entry, Value};
use crate::domain::ports::EntryRepository;

#[derive(Clone)]
pub struct SqliteEntryRepository {
    pool: SqlitePool,
}

impl SqliteEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryRepository for SqliteEntryRepository {
    async fn create(&self, entry: &Entry) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO entries (id, task_id, user_id, payload, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry.task_id.to_string())
        .bind(entry.user_id.map(|id| id.to_string()))
        .bind(entry.payload.to_string())
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match (result, entry.user_id) {
            (Ok(_), _) => Ok(()),
            (Err(e), Some(user_id)) if is_unique_violation(&e) => Err(DomainError::DuplicateEntry {
                task_id: entry.task_id,
                user_id,
            }),
            (Err(e), _) => Err(e.into()),
        }
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Entry>> {
        let row: Option<EntryRow> = sqlx::query_as("SELECT * FROM entries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Entry::try_from).transpose()
    }

    async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<Entry>> {
        let rows: Vec<EntryRow> =
            sqlx::query_as("SELECT * FROM entries WHERE task_id = ? ORDER BY rowid")
                .bind(task_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    async fn count_for_task(&self, task_id: Uuid) -> DomainResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries WHERE task_id = ?")
            .bind(task_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: String,
    task_id: String,
    user_id: Option<String>,
    payload: String,
    created_at: String,
}

impl TryFrom<EntryRow> for Entry {
    type Error = DomainError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Entry {
            id: parse_uuid(&row.id)?,
            task_id: parse_uuid(&row.task_id)?,
            user_id: parse_optional_uuid(row.user_id)?,
            payload: Value::from_json_str(&row.payload)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteDocumentRepository, SqliteTaskRepository,
    };
    use crate::domain::models::{Document, Task};
    use crate::domain::ports::{DocumentRepository, TaskRepository};
    use serde_json::json;

    async fn setup() -> (SqliteEntryRepository, Task) {
        let pool = create_migrated_test_pool().await.unwrap();
        let doc = Document::new("https://example.org/a.pdf");
        SqliteDocumentRepository::new(pool.clone())
            .create(&doc)
            .await
            .unwrap();
        let task = Task::new("t", Value::from(json!({"page": 1})), doc.id);
        SqliteTaskRepository::new(pool.clone())
            .create(&task)
            .await
            .unwrap();
        (SqliteEntryRepository::new(pool), task)
    }

    #[tokio::test]
    async fn test_entries_in_submission_order() {
        let (repo, task) = setup().await;
        let first = Entry::anonymous(task.id, Value::from(json!({"name": "a"})));
        let second = Entry::new(task.id, Some(Uuid::new_v4()), Value::from(json!({"name": "b"})));
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        let listed = repo.list_for_task(task.id).await.unwrap();
        assert_eq!(listed, vec![first.clone(), second]);
        assert_eq!(repo.count_for_task(task.id).await.unwrap(), 2);
        assert_eq!(repo.get(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_one_entry_per_user_and_task() {
        let (repo, task) = setup().await;
        let user = Uuid::new_v4();
        repo.create(&Entry::new(task.id, Some(user), Value::default()))
            .await
            .unwrap();

        let err = repo
            .create(&Entry::new(task.id, Some(user), Value::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEntry { user_id, .. } if user_id == user));

        // Anonymous entries are not limited.
        for _ in 0..2 {
            repo.create(&Entry::anonymous(task.id, Value::default()))
                .await
                .unwrap();
        }
        assert_eq!(repo.count_for_task(task.id).await.unwrap(), 3);
    }
}
