//! End-to-end verification flows, run against both storage backends.

mod common;

use common::{assert_close, memory_services, sqlite_services, Services};
use crowdcheck::domain::errors::DomainError;
use crowdcheck::domain::models::{Outcome, TaskState, Value, VerificationConfig};
use crowdcheck::domain::ports::{DocumentRepository, EntryRepository, TaskFilter, TaskRepository};
use crowdcheck::services::{own_progress, total_progress};
use serde_json::json;

fn page_payload() -> Value {
    Value::from(json!({
        "page_number": 4,
        "records": [
            {"name": "Ada Lovelace", "year": 1815},
            {"name": "Charles Babbage", "year": 1791},
        ]
    }))
}

async fn page_to_records_flow<T, E, D>(s: &Services<T, E, D>)
where
    T: TaskRepository,
    E: EntryRepository,
    D: DocumentRepository,
{
    let doc = s.tasks.create_document("https://example.org/register.pdf").await.unwrap();
    let page = s
        .tasks
        .create_root_task("page", Value::from(json!({"page": 4})), doc.id, None)
        .await
        .unwrap();

    // One entry: collecting, progress estimated from the entry count.
    let (_, decision) = s
        .verification
        .submit_entry(page.id, None, page_payload())
        .await
        .unwrap();
    assert_eq!(decision.outcome, Outcome::Collecting);
    assert_eq!(decision.confidence, None);

    let stored = s.tasks.get_task(page.id).await.unwrap();
    let own = own_progress(1, 3);
    assert_close(stored.own_progress, own);
    assert_close(stored.total_progress, total_progress(own, 2.0, &[]));
    assert_close(
        s.tasks.get_document(doc.id).await.unwrap().progress,
        stored.total_progress,
    );

    // Three agreeing entries verify the page and spawn one record per row.
    for _ in 0..2 {
        s.verification
            .submit_entry(page.id, None, page_payload())
            .await
            .unwrap();
    }
    let verified = s.tasks.get_task(page.id).await.unwrap();
    assert_eq!(verified.state, TaskState::Checked);
    assert_eq!(verified.verified_data, Some(page_payload()));
    assert_close(verified.own_progress, 100.0);

    let records = s.task_repo.get_children(page.id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.task_type == "record" && r.doc_id == doc.id));
    assert_close(verified.total_progress, 100.0 / 3.0);
    assert_close(s.tasks.get_document(doc.id).await.unwrap().progress, 100.0 / 3.0);

    // Verifying every record completes the page and the document.
    for record in &records {
        let row = record.params.get_path("value").unwrap().clone();
        for _ in 0..3 {
            s.verification
                .submit_entry(record.id, None, row.clone())
                .await
                .unwrap();
        }
        let done = s.tasks.get_task(record.id).await.unwrap();
        assert_eq!(done.state, TaskState::Checked);
        assert_eq!(done.verified_data, Some(row));
    }

    assert_close(s.tasks.get_task(page.id).await.unwrap().total_progress, 100.0);
    assert_close(s.tasks.get_document(doc.id).await.unwrap().progress, 100.0);
    assert!(matches!(
        s.tasks.choose_task(Some(doc.id)).await,
        Err(DomainError::NoTasksLeft)
    ));
}

async fn disagreement_flow<T, E, D>(s: &Services<T, E, D>)
where
    T: TaskRepository,
    E: EntryRepository,
    D: DocumentRepository,
{
    let doc = s.tasks.create_document("https://example.org/ledger.pdf").await.unwrap();
    let task = s
        .tasks
        .create_root_task("record", Value::from(json!({"line": 12})), doc.id, None)
        .await
        .unwrap();

    let answers = ["Smith", "Smyth", "Smith", "Smithe"];
    let mut outcomes = Vec::new();
    let mut entry_ids = Vec::new();
    for name in answers {
        let (entry, decision) = s
            .verification
            .submit_entry(task.id, None, Value::from(json!({"surname": name})))
            .await
            .unwrap();
        entry_ids.push(entry.id);
        outcomes.push(decision);
    }

    assert_eq!(outcomes[2].outcome, Outcome::Collecting);
    assert_close(outcomes[2].confidence.unwrap(), 2.0 / 3.0);
    assert_eq!(outcomes[3].outcome, Outcome::Dirty);
    assert_close(outcomes[3].confidence.unwrap(), 0.5);
    assert_eq!(s.tasks.get_task(task.id).await.unwrap().state, TaskState::Dirty);

    // A moderator settles it with the second entry.
    let closed = s.verification.force_verify(task.id, entry_ids[1]).await.unwrap();
    assert_eq!(closed.state, TaskState::ClosedManually);
    assert_eq!(closed.verified_data, Some(Value::from(json!({"surname": "Smyth"}))));
    assert_close(closed.total_progress, 100.0);

    // Closed tasks take no more entries and re-evaluation changes nothing.
    let err = s
        .verification
        .submit_entry(task.id, None, Value::from(json!({"surname": "Smith"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidStateTransition { .. }));

    let entries = s.entry_repo.list_for_task(task.id).await.unwrap();
    assert_eq!(entries.len(), 4);
    let decision = s.verification.evaluate(task.id, &entries).await.unwrap();
    assert_eq!(decision.outcome, Outcome::AlreadyClosed);
    assert_eq!(s.tasks.get_task(task.id).await.unwrap(), closed);
}

#[tokio::test]
async fn test_page_to_records_sqlite() {
    let s = sqlite_services(VerificationConfig::default()).await;
    page_to_records_flow(&s).await;
}

#[tokio::test]
async fn test_page_to_records_memory() {
    let s = memory_services(VerificationConfig::default());
    page_to_records_flow(&s).await;
}

#[tokio::test]
async fn test_disagreement_sqlite() {
    let s = sqlite_services(VerificationConfig::default()).await;
    disagreement_flow(&s).await;
}

#[tokio::test]
async fn test_disagreement_memory() {
    let s = memory_services(VerificationConfig::default());
    disagreement_flow(&s).await;
}

#[tokio::test]
async fn test_lower_confidence_threshold_accepts_majority() {
    let s = sqlite_services(VerificationConfig {
        min_confidence: 0.6,
        ..VerificationConfig::default()
    })
    .await;
    let doc = s.tasks.create_document("https://example.org/a.pdf").await.unwrap();
    let task = s
        .tasks
        .create_root_task("record", Value::from(json!({"line": 1})), doc.id, None)
        .await
        .unwrap();

    let mut last = None;
    for name in ["Ada", "Ada", "Ida"] {
        last = Some(
            s.verification
                .submit_entry(task.id, None, Value::from(json!({"name": name})))
                .await
                .unwrap()
                .1,
        );
    }

    let decision = last.unwrap();
    assert_eq!(decision.outcome, Outcome::Verified);
    assert_close(decision.confidence.unwrap(), 2.0 / 3.0);
    let task = s.tasks.get_task(task.id).await.unwrap();
    assert_eq!(task.verified_data, Some(Value::from(json!({"name": "Ada"}))));
}

#[tokio::test]
async fn test_user_cannot_answer_twice() {
    let s = sqlite_services(VerificationConfig::default()).await;
    let doc = s.tasks.create_document("https://example.org/a.pdf").await.unwrap();
    let task = s
        .tasks
        .create_root_task("record", Value::from(json!({"line": 1})), doc.id, None)
        .await
        .unwrap();
    let user = uuid::Uuid::new_v4();

    s.verification
        .submit_entry(task.id, Some(user), Value::from(json!({"name": "Ada"})))
        .await
        .unwrap();
    let err = s
        .verification
        .submit_entry(task.id, Some(user), Value::from(json!({"name": "Ada"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DuplicateEntry { user_id, .. } if user_id == user));
    assert_eq!(s.entry_repo.count_for_task(task.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mismatched_payload_shapes_are_rejected() {
    let s = memory_services(VerificationConfig::default());
    let doc = s.tasks.create_document("https://example.org/a.pdf").await.unwrap();
    let task = s
        .tasks
        .create_root_task("record", Value::from(json!({"line": 1})), doc.id, None)
        .await
        .unwrap();

    s.verification
        .submit_entry(task.id, None, Value::from(json!({"names": ["Ada"]})))
        .await
        .unwrap();
    s.verification
        .submit_entry(task.id, None, Value::from(json!({"names": ["Ada"]})))
        .await
        .unwrap();
    let err = s
        .verification
        .submit_entry(task.id, None, Value::from(json!({"names": "Ada"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SchemaMismatch { ref path, .. } if path == "names"));
    assert_eq!(s.entry_repo.count_for_task(task.id).await.unwrap(), 2);

    let open = s
        .tasks
        .list_tasks(TaskFilter {
            state: Some(TaskState::Open),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);

    // The refused entry does not hold the task back.
    let (_, decision) = s
        .verification
        .submit_entry(task.id, None, Value::from(json!({"names": ["Ada"]})))
        .await
        .unwrap();
    assert_eq!(decision.outcome, Outcome::Verified);
}
