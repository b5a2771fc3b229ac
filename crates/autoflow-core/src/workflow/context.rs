//! Per-run execution context.
//!
//! `ExecutionContext` is the mutable state threaded through one run: the
//! trigger payload and the results of the steps that have completed so far.
//! It is never persisted directly; the execution record carries the durable
//! trace.

use serde_json::Value;
use uuid::Uuid;

/// In-memory state of a single workflow run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub workflow_id: Uuid,
    pub execution_id: i64,
    pub user_id: i64,
    /// Payload that started the run. `None` for scheduled runs.
    pub trigger_data: Option<Value>,
    /// Completed step results in execution order.
    step_results: Vec<(String, Value)>,
}

impl ExecutionContext {
    pub fn new(
        workflow_id: Uuid,
        execution_id: i64,
        user_id: i64,
        trigger_data: Option<Value>,
    ) -> Self {
        Self {
            workflow_id,
            execution_id,
            user_id,
            trigger_data,
            step_results: Vec::new(),
        }
    }

    /// Record the result of a completed step.
    ///
    /// A repeated step ID replaces the earlier result but keeps its position.
    pub fn record_result(&mut self, step_id: &str, result: Value) {
        match self.step_results.iter_mut().find(|(id, _)| id == step_id) {
            Some((_, slot)) => *slot = result,
            None => self.step_results.push((step_id.to_string(), result)),
        }
    }

    /// Result of the step with the given ID, if it has completed.
    pub fn step_result(&self, step_id: &str) -> Option<&Value> {
        self.step_results
            .iter()
            .find(|(id, _)| id == step_id)
            .map(|(_, v)| v)
    }

    /// The most recently recorded step result.
    pub fn last_result(&self) -> Option<&Value> {
        self.step_results.last().map(|(_, v)| v)
    }

    /// Number of completed steps.
    pub fn completed_steps(&self) -> usize {
        self.step_results.len()
    }
}
