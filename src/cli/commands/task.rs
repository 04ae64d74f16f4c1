//! Task CLI commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::id_resolver::{resolve_document_id, resolve_entry_id, resolve_task_id};
use crate::cli::output::table::{list_table, percent, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{Config, Task, TaskState, Value};
use crate::domain::ports::{EntryRepository, TaskFilter};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task on a document or under a parent task
    Add {
        /// Registered task type
        #[arg(short = 't', long = "type")]
        task_type: String,
        /// Document ID (for root tasks)
        #[arg(short, long, conflicts_with = "parent", required_unless_present = "parent")]
        doc: Option<String>,
        /// Parent task ID (for child tasks)
        #[arg(long)]
        parent: Option<String>,
        /// Task params as JSON
        #[arg(short, long, default_value = "{}")]
        params: String,
        /// Priority, higher is served first
        #[arg(long)]
        priority: Option<f64>,
    },
    /// List tasks
    List {
        /// Filter by state (open, dirty, checked, manual)
        #[arg(short, long)]
        state: Option<String>,
        /// Filter by document
        #[arg(short, long)]
        doc: Option<String>,
        /// Filter by task type
        #[arg(short = 't', long = "type")]
        task_type: Option<String>,
        /// Maximum number of tasks to display
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Show task details
    Show {
        /// Task ID or unique prefix
        id: String,
    },
    /// Pick an open task to work on
    Choose {
        /// Restrict to one document
        #[arg(short, long)]
        doc: Option<String>,
    },
    /// Close a task with one entry's payload, bypassing consensus
    Verify {
        /// Task ID or unique prefix
        task: String,
        /// Entry whose payload becomes the verified value
        entry: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct TaskOutput {
    pub id: String,
    pub task_type: String,
    pub doc_id: String,
    pub parent_id: Option<String>,
    pub params: serde_json::Value,
    pub priority: f64,
    pub state: String,
    pub own_progress: f64,
    pub total_progress: f64,
    pub verified_data: Option<serde_json::Value>,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            task_type: task.task_type.clone(),
            doc_id: task.doc_id.to_string(),
            parent_id: task.parent_id.map(|id| id.to_string()),
            params: task.params.to_json(),
            priority: task.priority,
            state: task.state.to_string(),
            own_progress: task.own_progress,
            total_progress: task.total_progress,
            verified_data: task.verified_data.as_ref().map(Value::to_json),
        }
    }
}

impl CommandOutput for TaskOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.id),
            format!("Type: {}", self.task_type),
            format!("State: {}", self.state),
            format!("Document: {}", self.doc_id),
        ];
        if let Some(parent) = &self.parent_id {
            lines.push(format!("Parent: {parent}"));
        }
        lines.push(format!("Params: {}", self.params));
        lines.push(format!("Priority: {}", self.priority));
        lines.push(format!(
            "Progress: {} own, {} total",
            percent(self.own_progress),
            percent(self.total_progress)
        ));
        if let Some(value) = &self.verified_data {
            lines.push(format!("Verified: {value}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskOutput>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "type", "state", "priority", "progress", "params"]);
        for task in &self.tasks {
            table.add_row(vec![
                task.id[..8].to_string(),
                task.task_type.clone(),
                task.state.clone(),
                task.priority.to_string(),
                percent(task.total_progress),
                truncate(&task.params.to_string(), 40),
            ]);
        }
        render_list("task", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskDetailOutput {
    pub task: TaskOutput,
    pub entry_count: usize,
    pub children: Vec<TaskOutput>,
}

impl CommandOutput for TaskDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.task.to_human(), format!("Entries: {}", self.entry_count)];
        if !self.children.is_empty() {
            let mut table = list_table(&["id", "type", "state", "progress"]);
            for child in &self.children {
                table.add_row(vec![
                    child.id[..8].to_string(),
                    child.task_type.clone(),
                    child.state.clone(),
                    percent(child.total_progress),
                ]);
            }
            lines.push(format!("\nChildren:\n{table}"));
        }
        lines.join("\n")
    }
}

fn parse_params(params: &str) -> Result<Value> {
    Value::from_json_str(params).with_context(|| format!("Params are not valid JSON: {params}"))
}

pub async fn execute(args: TaskArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = CliContext::open(config).await?;

    match args.command {
        TaskCommands::Add {
            task_type,
            doc,
            parent,
            params,
            priority,
        } => {
            let params = parse_params(&params)?;
            let created = match (doc, parent) {
                (_, Some(parent)) => {
                    let parent_id = resolve_task_id(&ctx.pool, &parent).await?;
                    ctx.tasks
                        .create_child_task(parent_id, &task_type, params, priority)
                        .await
                }
                (Some(doc), None) => {
                    let doc_id = resolve_document_id(&ctx.pool, &doc).await?;
                    ctx.tasks
                        .create_root_task(&task_type, params, doc_id, priority)
                        .await
                }
                (None, None) => bail!("Either --doc or --parent is required"),
            };

            let task = match created {
                Err(DomainError::UnknownTaskType(name)) => bail!(
                    "Unknown task type '{name}'. Configured types: {}",
                    ctx.registry.names().join(", ")
                ),
                other => other.context("Failed to create task")?,
            };
            output(&TaskOutput::from(&task), json_mode);
        }

        TaskCommands::List {
            state,
            doc,
            task_type,
            limit,
        } => {
            let state = state
                .map(|s| {
                    TaskState::from_str(&s).ok_or_else(|| anyhow::anyhow!("Invalid state: {s}"))
                })
                .transpose()?;
            let doc_id = match doc {
                Some(doc) => Some(resolve_document_id(&ctx.pool, &doc).await?),
                None => None,
            };

            let tasks = ctx
                .tasks
                .list_tasks(TaskFilter {
                    state,
                    doc_id,
                    task_type,
                    limit: Some(limit),
                    ..Default::default()
                })
                .await?;
            let out = TaskListOutput {
                total: tasks.len(),
                tasks: tasks.iter().map(TaskOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        TaskCommands::Show { id } => {
            let task_id = resolve_task_id(&ctx.pool, &id).await?;
            let task = ctx.tasks.get_task(task_id).await?;
            let children = ctx
                .tasks
                .list_tasks(TaskFilter {
                    parent_id: Some(task_id),
                    ..Default::default()
                })
                .await?;
            let entry_count = ctx.entries.count_for_task(task_id).await?;

            let out = TaskDetailOutput {
                task: TaskOutput::from(&task),
                entry_count,
                children: children.iter().map(TaskOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        TaskCommands::Choose { doc } => {
            let doc_id = match doc {
                Some(doc) => Some(resolve_document_id(&ctx.pool, &doc).await?),
                None => None,
            };
            match ctx.tasks.choose_task(doc_id).await {
                Ok(task) => output(&TaskOutput::from(&task), json_mode),
                Err(DomainError::NoTasksLeft) => bail!("No open tasks left"),
                Err(e) => return Err(e).context("Failed to choose a task"),
            }
        }

        TaskCommands::Verify { task, entry } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let entry_id = resolve_entry_id(&ctx.pool, &entry).await?;
            let task = ctx
                .verification
                .force_verify(task_id, entry_id)
                .await
                .context("Failed to verify task")?;
            output(&TaskOutput::from(&task), json_mode);
        }
    }

    Ok(())
}
