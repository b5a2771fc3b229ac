use thiserror::Error;

/// Errors from repository operations (used by trait definitions in autoflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to workflow management.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("invalid workflow: {0}")]
    Validation(String),

    #[error("workflow {0} is not webhook-triggered")]
    NotWebhookTriggered(String),

    #[error("execution not found: {0}")]
    ExecutionNotFound(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
