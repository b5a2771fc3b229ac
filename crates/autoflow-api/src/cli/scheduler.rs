//! `autoflow reconcile`: one scheduler pass from the command line.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use crate::state::AppState;

/// Run a single reconciliation pass and print the report plus pending jobs.
///
/// The queue lives in this process only, so the listing shows what a server
/// started now would schedule first.
pub async fn reconcile(state: &AppState, json: bool) -> Result<()> {
    let report = state.scheduler.reconcile().await?;
    let jobs = state.scheduler.pending_jobs().await;

    if json {
        let out = serde_json::json!({
            "report": report,
            "pending": jobs
                .iter()
                .map(|j| serde_json::json!({
                    "workflowId": j.workflow_id,
                    "workflowName": j.definition.name,
                    "runAt": j.run_at.to_rfc3339(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Reconciled: {} scheduled, {} unchanged, {} skipped, {} removed",
        style("*").green().bold(),
        report.scheduled,
        report.unchanged,
        report.skipped,
        report.removed
    );
    println!();

    if jobs.is_empty() {
        println!("  No active schedule-triggered workflows.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Next run").fg(Color::Cyan),
            Cell::new("Workflow"),
            Cell::new("Id"),
        ]);
    for job in &jobs {
        table.add_row(vec![
            Cell::new(job.run_at.format("%Y-%m-%d %H:%M:%S UTC")),
            Cell::new(&job.definition.name),
            Cell::new(job.workflow_id),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}
