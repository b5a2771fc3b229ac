//! Workflow definition parsing and validation.
//!
//! Definitions arrive either as JSON over the API or as YAML/JSON documents
//! from the CLI. Both paths go through [`validate_definition`] before a
//! workflow is stored. Unknown step types are accepted here and fail at
//! dispatch time instead.

use std::collections::HashSet;

use autoflow_types::error::WorkflowError;
use autoflow_types::workflow::{Trigger, WorkflowDefinition, WorkflowDocument};
use chrono::Utc;

use super::scheduler::next_fire_after;

/// Parse a workflow document. YAML is a superset of JSON, so both work.
pub fn parse_workflow_document(text: &str) -> Result<WorkflowDocument, WorkflowError> {
    serde_yaml_ng::from_str(text).map_err(|e| WorkflowError::Validation(format!("parse error: {e}")))
}

/// Check the structural rules every stored definition must satisfy.
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.name.trim().is_empty() {
        return Err(WorkflowError::Validation("workflow name cannot be empty".to_string()));
    }
    if def.steps.is_empty() {
        return Err(WorkflowError::Validation("at least one step is required".to_string()));
    }

    let mut seen = HashSet::new();
    for step in &def.steps {
        if step.id.trim().is_empty() {
            return Err(WorkflowError::Validation("step id cannot be empty".to_string()));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(WorkflowError::Validation(format!(
                "duplicate step id: '{}'",
                step.id
            )));
        }
    }

    match &def.trigger {
        Trigger::Schedule { cron } => {
            next_fire_after(cron, Utc::now())
                .map_err(|e| WorkflowError::Validation(e.to_string()))?;
        }
        Trigger::Webhook { webhook_id } if webhook_id.trim().is_empty() => {
            return Err(WorkflowError::Validation("webhookId cannot be empty".to_string()));
        }
        Trigger::Webhook { .. } | Trigger::Manual => {}
    }

    Ok(())
}
