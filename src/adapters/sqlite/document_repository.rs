//! SQLite implementation of the DocumentRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Document;
use crate::domain::ports::DocumentRepository;

#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn create(&self, document: &Document) -> DomainResult<()> {
        sqlx::query("INSERT INTO documents (id, url, progress, created_at) VALUES (?, ?, ?, ?)")
            .bind(document.id.to_string())
            .bind(&document.url)
            .bind(document.progress)
            .bind(document.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Document::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as("SELECT * FROM documents ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn update_progress(&self, id: Uuid, progress: f64) -> DomainResult<()> {
        let result = sqlx::query("UPDATE documents SET progress = ? WHERE id = ?")
            .bind(progress)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DocumentNotFound(id));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    url: String,
    progress: f64,
    created_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DomainError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: parse_uuid(&row.id)?,
            url: row.url,
            progress: row.progress,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
