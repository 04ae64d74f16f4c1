//! Common test utilities for integration tests
//!
//! Builds the services over either storage backend with a small two-level
//! task type setup: a `page` lists `records`, each of which becomes a
//! `record` task.

#![allow(dead_code)]

use std::sync::Arc;

use crowdcheck::adapters::memory::{
    InMemoryDocumentRepository, InMemoryEntryRepository, InMemoryTaskRepository,
};
use crowdcheck::adapters::sqlite::{
    create_migrated_test_pool, SqliteDocumentRepository, SqliteEntryRepository,
    SqliteTaskRepository,
};
use crowdcheck::domain::models::{ChildRuleConfig, TaskTypeConfig, VerificationConfig};
use crowdcheck::domain::ports::{DocumentRepository, EntryRepository, TaskRepository};
use crowdcheck::services::{TaskService, TaskTypeRegistry, VerificationService};

pub struct Services<T: TaskRepository, E: EntryRepository, D: DocumentRepository> {
    pub tasks: TaskService<T, D>,
    pub verification: VerificationService<T, E, D>,
    pub task_repo: Arc<T>,
    pub entry_repo: Arc<E>,
    pub document_repo: Arc<D>,
}

pub type SqliteServices =
    Services<SqliteTaskRepository, SqliteEntryRepository, SqliteDocumentRepository>;
pub type MemoryServices =
    Services<InMemoryTaskRepository, InMemoryEntryRepository, InMemoryDocumentRepository>;

/// `page` spawns one `record` child per element of its `records` field.
pub fn task_types() -> Vec<TaskTypeConfig> {
    vec![
        TaskTypeConfig {
            name: "page".to_string(),
            average_subtasks_count: 2.0,
            children: vec![ChildRuleConfig {
                task_type: "record".to_string(),
                from_field: "records".to_string(),
            }],
            unanimous_fields: vec![],
        },
        TaskTypeConfig {
            name: "record".to_string(),
            ..Default::default()
        },
    ]
}

pub fn build<T, E, D>(
    task_repo: Arc<T>,
    entry_repo: Arc<E>,
    document_repo: Arc<D>,
    config: VerificationConfig,
) -> Services<T, E, D>
where
    T: TaskRepository,
    E: EntryRepository,
    D: DocumentRepository,
{
    let registry = Arc::new(TaskTypeRegistry::from_config(&task_types()));
    let tasks = TaskService::new(
        Arc::clone(&task_repo),
        Arc::clone(&document_repo),
        Arc::clone(&registry),
    );
    let verification = VerificationService::new(
        Arc::clone(&task_repo),
        Arc::clone(&entry_repo),
        Arc::clone(&document_repo),
        registry,
        config,
    );
    Services {
        tasks,
        verification,
        task_repo,
        entry_repo,
        document_repo,
    }
}

pub async fn sqlite_services(config: VerificationConfig) -> SqliteServices {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    build(
        Arc::new(SqliteTaskRepository::new(pool.clone())),
        Arc::new(SqliteEntryRepository::new(pool.clone())),
        Arc::new(SqliteDocumentRepository::new(pool)),
        config,
    )
}

pub fn memory_services(config: VerificationConfig) -> MemoryServices {
    build(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(InMemoryEntryRepository::new()),
        Arc::new(InMemoryDocumentRepository::new()),
        config,
    )
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
