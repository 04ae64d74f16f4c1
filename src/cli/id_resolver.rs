//! Short ID prefix resolution for CLI commands.
//!
//! Allows users to specify any unique prefix of a UUID instead of the full
//! ID, similar to git short hashes.

use anyhow::{bail, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

const TASK_QUERY: &str = "SELECT id FROM tasks WHERE id LIKE ? ORDER BY id";
const DOCUMENT_QUERY: &str = "SELECT id FROM documents WHERE id LIKE ? ORDER BY id";
const ENTRY_QUERY: &str = "SELECT id FROM entries WHERE id LIKE ? ORDER BY id";

/// Resolve a task ID prefix to a full UUID.
pub async fn resolve_task_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "task", TASK_QUERY).await
}

/// Resolve a document ID prefix to a full UUID.
pub async fn resolve_document_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "document", DOCUMENT_QUERY).await
}

/// Resolve an entry ID prefix to a full UUID.
pub async fn resolve_entry_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "entry", ENTRY_QUERY).await
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }
    Ok(())
}

async fn resolve_prefix(pool: &SqlitePool, prefix: &str, entity: &str, query: &str) -> Result<Uuid> {
    // Full UUIDs skip the lookup.
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }

    validate_prefix(prefix)?;

    let rows: Vec<(String,)> = sqlx::query_as(query)
        .bind(format!("{}%", prefix.to_lowercase()))
        .fetch_all(pool)
        .await?;

    match rows.as_slice() {
        [] => bail!("No {entity} found matching '{prefix}'"),
        [(id,)] => Ok(Uuid::parse_str(id)?),
        _ => {
            let mut msg = format!("Ambiguous prefix '{prefix}': matches {} {entity} ids:", rows.len());
            for (id,) in &rows {
                msg.push_str("\n  ");
                msg.push_str(id);
            }
            bail!("{msg}")
        }
    }
}
