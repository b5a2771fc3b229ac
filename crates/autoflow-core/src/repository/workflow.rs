//! Workflow repository trait definition.
//!
//! Defines the storage interface for stored workflows and their execution
//! records. The infrastructure layer (autoflow-infra) implements this trait
//! with SQLite persistence.

use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{
    ExecutionRecord, ExecutionUpdate, NewExecution, TriggerKind, Workflow, WorkflowStatus,
};
use uuid::Uuid;

/// Hard upper bound on the number of executions a single list call returns.
pub const MAX_EXECUTION_PAGE: u32 = 200;

/// Repository trait for workflow persistence.
///
/// Covers two entity families:
/// - **Workflows:** CRUD plus the trigger/status query used by the scheduler
///   and webhook dispatch.
/// - **Executions:** create a `running` record, apply its single terminal
///   update, query history.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Insert a new workflow. Fails with `Conflict` if the ID already exists.
    fn create_workflow(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow by its UUID.
    fn get_workflow(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, RepositoryError>> + Send;

    /// List workflows, optionally filtered by owner, newest first.
    fn list_workflows(
        &self,
        user_id: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Workflow>, RepositoryError>> + Send;

    /// Replace a stored workflow. Fails with `NotFound` if it does not exist.
    fn update_workflow(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a workflow and its executions. Returns `true` if it existed.
    fn delete_workflow(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// List workflows whose trigger is of `kind` and whose status is `status`.
    fn list_workflows_by_trigger(
        &self,
        kind: TriggerKind,
        status: WorkflowStatus,
    ) -> impl std::future::Future<Output = Result<Vec<Workflow>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    /// Create a `running` execution record and return its assigned ID.
    fn create_execution(
        &self,
        execution: &NewExecution,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Apply the terminal update to an execution record.
    fn update_execution(
        &self,
        id: i64,
        update: &ExecutionUpdate,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get an execution record by ID.
    fn get_execution(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ExecutionRecord>, RepositoryError>> + Send;

    /// List executions of a workflow, ordered by started_at DESC.
    ///
    /// Implementations clamp `limit` to `1..=MAX_EXECUTION_PAGE`.
    fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ExecutionRecord>, RepositoryError>> + Send;
}

/// Clamp a requested page size to the range every implementation honors.
pub fn clamp_execution_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_EXECUTION_PAGE)
}
