//! Wiring of the SQLite-backed services used by every command.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteDocumentRepository, SqliteEntryRepository,
    SqliteTaskRepository,
};
use crate::domain::models::Config;
use crate::services::{TaskService, TaskTypeRegistry, VerificationService};

pub type CliTaskService = TaskService<SqliteTaskRepository, SqliteDocumentRepository>;
pub type CliVerificationService =
    VerificationService<SqliteTaskRepository, SqliteEntryRepository, SqliteDocumentRepository>;

pub struct CliContext {
    pub pool: SqlitePool,
    pub registry: Arc<TaskTypeRegistry>,
    pub tasks: CliTaskService,
    pub verification: CliVerificationService,
    pub entries: Arc<SqliteEntryRepository>,
}

impl CliContext {
    /// Open the configured database, applying pending migrations.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = initialize_database(
            &config.database.url(),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to open database at {}. Run 'crowdcheck init' first.",
                config.database.path
            )
        })?;
        Ok(Self::from_pool(pool, config))
    }

    pub fn from_pool(pool: SqlitePool, config: &Config) -> Self {
        let registry = Arc::new(TaskTypeRegistry::from_config(&config.task_types));
        let task_repo = Arc::new(SqliteTaskRepository::new(pool.clone()));
        let entry_repo = Arc::new(SqliteEntryRepository::new(pool.clone()));
        let document_repo = Arc::new(SqliteDocumentRepository::new(pool.clone()));

        let tasks = TaskService::new(
            Arc::clone(&task_repo),
            Arc::clone(&document_repo),
            Arc::clone(&registry),
        )
        .with_chooser(config.chooser.clone());
        let verification = VerificationService::new(
            task_repo,
            Arc::clone(&entry_repo),
            document_repo,
            Arc::clone(&registry),
            config.verification.clone(),
        );

        Self {
            pool,
            registry,
            tasks,
            verification,
            entries: entry_repo,
        }
    }
}
