//! Document CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::id_resolver::resolve_document_id;
use crate::cli::output::table::{list_table, percent, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Config, Document};
use crate::domain::ports::TaskFilter;

#[derive(Args, Debug)]
pub struct DocumentArgs {
    #[command(subcommand)]
    pub command: DocumentCommands,
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommands {
    /// Register a document to transcribe
    Add {
        /// Location of the scanned document
        url: String,
    },
    /// List documents
    List,
    /// Show a document with its root tasks
    Show {
        /// Document ID or unique prefix
        id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct DocumentOutput {
    pub id: String,
    pub url: String,
    pub progress: f64,
    pub created_at: String,
}

impl From<&Document> for DocumentOutput {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.to_string(),
            url: doc.url.clone(),
            progress: doc.progress,
            created_at: doc.created_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for DocumentOutput {
    fn to_human(&self) -> String {
        format!(
            "Document: {}\nURL: {}\nProgress: {}",
            self.id,
            self.url,
            percent(self.progress)
        )
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DocumentListOutput {
    pub documents: Vec<DocumentOutput>,
    pub total: usize,
}

impl CommandOutput for DocumentListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "progress", "url"]);
        for doc in &self.documents {
            table.add_row(vec![
                doc.id[..8].to_string(),
                percent(doc.progress),
                truncate(&doc.url, 60),
            ]);
        }
        render_list("document", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RootTaskSummary {
    pub id: String,
    pub task_type: String,
    pub state: String,
    pub total_progress: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct DocumentDetailOutput {
    pub document: DocumentOutput,
    pub root_tasks: Vec<RootTaskSummary>,
}

impl CommandOutput for DocumentDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.document.to_human()];
        if self.root_tasks.is_empty() {
            lines.push("\nNo root tasks.".to_string());
        } else {
            let mut table = list_table(&["id", "type", "state", "progress"]);
            for task in &self.root_tasks {
                table.add_row(vec![
                    task.id[..8].to_string(),
                    task.task_type.clone(),
                    task.state.clone(),
                    percent(task.total_progress),
                ]);
            }
            lines.push(format!("\nRoot tasks:\n{table}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: DocumentArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CliContext::open(config).await?;

    match args.command {
        DocumentCommands::Add { url } => {
            let doc = ctx
                .tasks
                .create_document(url)
                .await
                .context("Failed to create document")?;
            output(&DocumentOutput::from(&doc), json_mode);
        }

        DocumentCommands::List => {
            let docs = ctx.tasks.list_documents().await?;
            let out = DocumentListOutput {
                total: docs.len(),
                documents: docs.iter().map(DocumentOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        DocumentCommands::Show { id } => {
            let doc_id = resolve_document_id(&ctx.pool, &id).await?;
            let doc = ctx.tasks.get_document(doc_id).await?;
            let roots = ctx
                .tasks
                .list_tasks(TaskFilter {
                    doc_id: Some(doc_id),
                    roots_only: true,
                    ..Default::default()
                })
                .await?;

            let out = DocumentDetailOutput {
                document: DocumentOutput::from(&doc),
                root_tasks: roots
                    .iter()
                    .map(|task| RootTaskSummary {
                        id: task.id.to_string(),
                        task_type: task.task_type.clone(),
                        state: task.state.to_string(),
                        total_progress: task.total_progress,
                    })
                    .collect(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
