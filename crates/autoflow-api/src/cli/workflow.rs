//! CLI workflow management subcommands.
//!
//! Provides create, list, show, run, executions, deploy, pause, and delete
//! operations. Everything goes through `WorkflowService`, the same path the
//! REST API uses.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use uuid::Uuid;

use autoflow_core::workflow::definition::parse_workflow_document;
use autoflow_types::workflow::{
    CreateWorkflowRequest, ExecutionRecord, ExecutionStatus, StepStatus, Workflow, WorkflowStatus,
};

use crate::state::AppState;

/// Workflow management subcommands.
#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Create a draft workflow from a YAML or JSON file.
    Create {
        /// Path to the workflow document.
        file: PathBuf,

        /// Workflow name (defaults to the document's `name`).
        #[arg(long)]
        name: Option<String>,

        /// Free-form description.
        #[arg(long)]
        description: Option<String>,

        /// Owning user id (defaults to the configured default user).
        #[arg(long)]
        user: Option<i64>,
    },

    /// List workflows.
    #[command(alias = "ls")]
    List {
        /// Only workflows owned by this user.
        #[arg(long)]
        user: Option<i64>,
    },

    /// Show a workflow's definition and status.
    Show {
        /// Workflow id.
        id: Uuid,
    },

    /// Run a workflow now and wait for the result.
    Run {
        /// Workflow id.
        id: Uuid,

        /// JSON trigger data, available as `{{trigger.data...}}`.
        #[arg(long)]
        data: Option<String>,
    },

    /// Show the execution history of a workflow, newest first.
    Executions {
        /// Workflow id.
        id: Uuid,

        /// Maximum number of executions to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Activate a workflow (and schedule it if schedule-triggered).
    Deploy {
        /// Workflow id.
        id: Uuid,
    },

    /// Pause a workflow and drop its pending scheduled runs.
    Pause {
        /// Workflow id.
        id: Uuid,
    },

    /// Delete a workflow and its execution history.
    #[command(alias = "rm")]
    Delete {
        /// Workflow id.
        id: Uuid,
    },
}

/// Handle a workflow subcommand.
pub async fn handle_workflow_command(
    cmd: WorkflowCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        WorkflowCommand::Create {
            file,
            name,
            description,
            user,
        } => handle_create(&file, name, description, user, state, json).await,
        WorkflowCommand::List { user } => handle_list(user, state, json).await,
        WorkflowCommand::Show { id } => handle_show(&id, state, json).await,
        WorkflowCommand::Run { id, data } => handle_run(&id, data.as_deref(), state, json).await,
        WorkflowCommand::Executions { id, limit } => {
            handle_executions(&id, limit, state, json).await
        }
        WorkflowCommand::Deploy { id } => {
            let workflow = state.workflow_service.deploy(&id).await?;
            print_transition(&workflow, "deployed", json)
        }
        WorkflowCommand::Pause { id } => {
            let workflow = state.workflow_service.pause(&id).await?;
            print_transition(&workflow, "paused", json)
        }
        WorkflowCommand::Delete { id } => {
            state.workflow_service.delete(&id).await?;
            if json {
                println!("{}", serde_json::json!({ "deleted": true, "id": id }));
            } else {
                println!();
                println!("  {} Deleted workflow {}", style("*").green().bold(), style(id).cyan());
                println!();
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

async fn handle_create(
    file: &Path,
    name: Option<String>,
    description: Option<String>,
    user: Option<i64>,
    state: &AppState,
    json: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read workflow file '{}'", file.display()))?;
    let document = parse_workflow_document(&text)?;

    let name = name
        .or_else(|| document.name.clone())
        .or_else(|| file.file_stem().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_default();
    let user_id = user.unwrap_or(state.config.default_user_id);

    let workflow = state
        .workflow_service
        .create(
            user_id,
            CreateWorkflowRequest {
                name,
                description,
                workflow: document,
            },
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Created workflow '{}'",
        style("*").green().bold(),
        style(&workflow.name).cyan()
    );
    println!("  Id: {}", workflow.id);
    println!("  Trigger: {}", workflow.definition.trigger.kind());
    println!("  Steps: {}", workflow.definition.steps.len());
    println!(
        "  Deploy with: {}",
        style(format!("autoflow workflow deploy {}", workflow.id)).dim()
    );
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// List / Show
// ---------------------------------------------------------------------------

async fn handle_list(user: Option<i64>, state: &AppState, json: bool) -> Result<()> {
    let workflows = state.workflow_service.list(user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!("  No workflows found.");
        println!(
            "  Create one with: {}",
            style("autoflow workflow create <file.yaml>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Status"),
            Cell::new("Trigger"),
            Cell::new("Steps"),
            Cell::new("Updated"),
        ]);

    for w in &workflows {
        table.add_row(vec![
            Cell::new(w.id),
            Cell::new(&w.name),
            status_cell(w.status),
            Cell::new(trigger_label(w)),
            Cell::new(w.definition.steps.len()),
            Cell::new(w.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn handle_show(id: &Uuid, state: &AppState, json: bool) -> Result<()> {
    let workflow = state.workflow_service.get(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Workflow:").bold(), style(&workflow.name).cyan());
    println!("  Id: {}", workflow.id);
    println!("  Owner: user {}", workflow.user_id);
    println!("  Status: {}", workflow.status);
    println!("  Trigger: {}", trigger_label(&workflow));
    if let Some(ref description) = workflow.description {
        println!("  Description: {description}");
    }
    if let Some(deployed) = workflow.deployed_at {
        println!("  Deployed: {}", deployed.format("%Y-%m-%d %H:%M:%S"));
    }
    if workflow.definition.trigger.webhook_id().is_some() {
        let url = state.workflow_service.webhook_url(id).await?;
        println!("  Webhook URL: {}", style(url).underlined());
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Step"),
            Cell::new("Type"),
            Cell::new("Config"),
        ]);
    for (index, step) in workflow.definition.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&step.id),
            Cell::new(&step.step_type),
            Cell::new(truncate(&step.config.to_string(), 60)),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Run / Executions
// ---------------------------------------------------------------------------

async fn handle_run(id: &Uuid, data: Option<&str>, state: &AppState, json: bool) -> Result<()> {
    let trigger_data = data
        .map(|raw| serde_json::from_str::<serde_json::Value>(raw))
        .transpose()
        .context("--data must be valid JSON")?;

    let record = state.workflow_service.execute(id, trigger_data).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

async fn handle_executions(id: &Uuid, limit: u32, state: &AppState, json: bool) -> Result<()> {
    let records = state.workflow_service.list_executions(id, Some(limit)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!("  No executions yet.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Execution").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Started"),
            Cell::new("Duration"),
            Cell::new("Steps"),
            Cell::new("Error"),
        ]);

    for r in &records {
        let duration = r
            .completed_at
            .map(|done| format!("{}ms", (done - r.started_at).num_milliseconds()))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(r.id),
            execution_status_cell(r.status),
            Cell::new(r.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(duration),
            Cell::new(r.execution_log.len()),
            Cell::new(truncate(r.error_message.as_deref().unwrap_or("-"), 50)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

fn print_record(record: &ExecutionRecord) {
    println!();
    println!(
        "  {} Execution {} {}",
        style("Workflow:").bold(),
        style(record.id).cyan(),
        match record.status {
            ExecutionStatus::Completed => style(record.status.to_string()).green(),
            ExecutionStatus::Failed => style(record.status.to_string()).red(),
            ExecutionStatus::Running => style(record.status.to_string()).yellow(),
        }
    );
    if let Some(ref err) = record.error_message {
        println!("  Error: {}", style(err).red());
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Step").fg(Color::Cyan),
            Cell::new("Type"),
            Cell::new("Status"),
            Cell::new("Output"),
        ]);
    for entry in &record.execution_log {
        let output = match (&entry.result, &entry.error) {
            (_, Some(err)) => err.clone(),
            (Some(result), None) => result.to_string(),
            (None, None) => "-".to_string(),
        };
        let status = match entry.status {
            StepStatus::Completed => Cell::new("completed").fg(Color::Green),
            StepStatus::Failed => Cell::new("failed").fg(Color::Red),
            StepStatus::Running => Cell::new("running").fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(&entry.step_id),
            Cell::new(&entry.step_type),
            status,
            Cell::new(truncate(&output, 60)),
        ]);
    }
    println!("{table}");
    println!();
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_transition(workflow: &Workflow, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(workflow)?);
        return Ok(());
    }
    println!();
    println!(
        "  {} Workflow '{}' {verb} ({})",
        style("*").green().bold(),
        style(&workflow.name).cyan(),
        trigger_label(workflow)
    );
    println!();
    Ok(())
}

fn trigger_label(workflow: &Workflow) -> String {
    let trigger = &workflow.definition.trigger;
    match (trigger.cron(), trigger.webhook_id()) {
        (Some(cron), _) => format!("schedule ({cron})"),
        (_, Some(hook)) => format!("webhook ({hook})"),
        _ => trigger.kind().to_string(),
    }
}

fn status_cell(status: WorkflowStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        WorkflowStatus::Active => cell.fg(Color::Green),
        WorkflowStatus::Paused => cell.fg(Color::Yellow),
        WorkflowStatus::Draft => cell,
    }
}

fn execution_status_cell(status: ExecutionStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        ExecutionStatus::Completed => cell.fg(Color::Green),
        ExecutionStatus::Failed => cell.fg(Color::Red),
        ExecutionStatus::Running => cell.fg(Color::Yellow),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
