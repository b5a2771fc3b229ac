//! Sequential, fail-fast workflow execution.
//!
//! `ExecutionEngine::execute` turns a definition plus an optional trigger
//! payload into a persisted `ExecutionRecord`:
//!
//! 1. Create a `running` record (trigger data snapshot, `{}` when absent).
//! 2. For each step in order: resolve templates, dispatch, log the outcome.
//! 3. Stop at the first failure.
//! 4. Write the terminal status, `completedAt`, error and log exactly once.
//!
//! A failing step is not an error of `execute`; it comes back as a record
//! with status `failed`. Only store failures surface as [`ExecutorError`].

use std::sync::Arc;

use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{
    ExecutionRecord, ExecutionStatus, ExecutionUpdate, NewExecution, StepLogEntry,
    WorkflowDefinition,
};
use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::context::ExecutionContext;
use super::step_runner::StepRunner;
use crate::repository::workflow::WorkflowRepository;

/// Errors that prevent a run from being recorded at all.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("execution store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Runs workflow definitions against a store and a step runner.
pub struct ExecutionEngine<R: WorkflowRepository> {
    repo: Arc<R>,
    runner: Arc<StepRunner>,
}

impl<R: WorkflowRepository> Clone for ExecutionEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<R: WorkflowRepository + 'static> ExecutionEngine<R> {
    pub fn new(repo: Arc<R>, runner: Arc<StepRunner>) -> Self {
        Self { repo, runner }
    }

    /// Execute every step of `definition` in order and persist the outcome.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        user_id: i64,
        trigger_data: Option<Value>,
    ) -> Result<ExecutionRecord, ExecutorError> {
        let started_at = Utc::now();
        let snapshot = trigger_data
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let execution_id = self
            .repo
            .create_execution(&NewExecution {
                workflow_id: definition.id,
                started_at,
                trigger_data: snapshot.clone(),
            })
            .await?;

        tracing::info!(
            workflow_id = %definition.id,
            execution_id,
            steps = definition.steps.len(),
            "workflow execution started"
        );

        let mut ctx = ExecutionContext::new(definition.id, execution_id, user_id, trigger_data);
        let mut log = Vec::with_capacity(definition.steps.len());
        let mut failure = None;

        for step in &definition.steps {
            let entry = StepLogEntry::start(step);
            match self.runner.run(step, &ctx).await {
                Ok(result) => {
                    tracing::debug!(execution_id, step_id = %step.id, "step completed");
                    ctx.record_result(&step.id, result.clone());
                    log.push(entry.complete(result));
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(
                        execution_id,
                        step_id = %step.id,
                        step_type = %step.step_type,
                        error = %message,
                        "step failed, aborting run"
                    );
                    log.push(entry.fail(message.clone()));
                    failure = Some(message);
                    break;
                }
            }
        }

        let status = if failure.is_some() {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };
        let update = ExecutionUpdate {
            status,
            completed_at: Utc::now(),
            error_message: failure,
            execution_log: log,
        };
        self.repo.update_execution(execution_id, &update).await?;

        tracing::info!(
            workflow_id = %definition.id,
            execution_id,
            status = %update.status,
            "workflow execution finished"
        );

        Ok(ExecutionRecord {
            id: execution_id,
            workflow_id: definition.id,
            status: update.status,
            started_at,
            completed_at: Some(update.completed_at),
            error_message: update.error_message,
            execution_log: update.execution_log,
            trigger_data: snapshot,
        })
    }

    /// Run `execute` on a Tokio task.
    pub fn spawn(
        &self,
        definition: WorkflowDefinition,
        user_id: i64,
        trigger_data: Option<Value>,
    ) -> JoinHandle<Result<ExecutionRecord, ExecutorError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.execute(&definition, user_id, trigger_data).await })
    }
}
