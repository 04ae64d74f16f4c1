//! Entry CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::CliContext;
use crate::cli::id_resolver::resolve_task_id;
use crate::cli::output::table::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, Decision, Entry, Value};
use crate::domain::ports::EntryRepository;

#[derive(Args, Debug)]
pub struct EntryArgs {
    #[command(subcommand)]
    pub command: EntryCommands,
}

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// Submit an answer for a task and run the crosscheck
    Submit {
        /// Task ID or unique prefix
        task: String,
        /// Answer payload as JSON
        payload: String,
        /// Submitting user; anonymous when omitted
        #[arg(short, long)]
        user: Option<Uuid>,
    },
    /// List a task's entries in submission order
    List {
        /// Task ID or unique prefix
        task: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct EntryOutput {
    pub id: String,
    pub task_id: String,
    pub user_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: String,
}

impl From<&Entry> for EntryOutput {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.to_string(),
            task_id: entry.task_id.to_string(),
            user_id: entry.user_id.map(|id| id.to_string()),
            payload: entry.payload.to_json(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SubmitOutput {
    pub entry: EntryOutput,
    pub decision: Decision,
}

impl CommandOutput for SubmitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Entry recorded: {}", self.entry.id),
            format!(
                "Task {}: {} ({} entries)",
                &self.entry.task_id[..8],
                self.decision.outcome,
                self.decision.entry_count
            ),
        ];
        if let Some(confidence) = self.decision.confidence {
            lines.push(format!("Confidence: {confidence:.3}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EntryListOutput {
    pub entries: Vec<EntryOutput>,
    pub total: usize,
}

impl CommandOutput for EntryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "user", "created", "payload"]);
        for entry in &self.entries {
            table.add_row(vec![
                entry.id[..8].to_string(),
                entry
                    .user_id
                    .as_deref()
                    .map_or_else(|| "anonymous".to_string(), |id| id[..8].to_string()),
                entry.created_at.clone(),
                truncate(&entry.payload.to_string(), 50),
            ]);
        }
        render_list("entry", &table, self.total)
    }
}

pub async fn execute(args: EntryArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CliContext::open(config).await?;

    match args.command {
        EntryCommands::Submit {
            task,
            payload,
            user,
        } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let payload = Value::from_json_str(&payload)
                .with_context(|| format!("Payload is not valid JSON: {payload}"))?;

            let (entry, decision) = ctx
                .verification
                .submit_entry(task_id, user, payload)
                .await
                .context("Failed to submit entry")?;
            let out = SubmitOutput {
                entry: EntryOutput::from(&entry),
                decision,
            };
            output(&out, json_mode);
        }

        EntryCommands::List { task } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let entries = ctx.entries.list_for_task(task_id).await?;
            let out = EntryListOutput {
                total: entries.len(),
                entries: entries.iter().map(EntryOutput::from).collect(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
