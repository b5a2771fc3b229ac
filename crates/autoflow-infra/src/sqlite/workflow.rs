//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `autoflow-core` using sqlx with split
//! read/write pools. Definitions and execution logs are stored as JSON text.
//! The trigger type and webhook id are denormalized into their own columns so
//! the scheduler and webhook lookups stay indexed queries.

use autoflow_core::repository::workflow::{clamp_execution_limit, WorkflowRepository};
use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{
    ExecutionRecord, ExecutionStatus, ExecutionUpdate, NewExecution, StepLogEntry, TriggerKind,
    Workflow, WorkflowDefinition, WorkflowStatus,
};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const WORKFLOW_COLUMNS: &str =
    "id, user_id, name, description, definition, status, created_at, updated_at, deployed_at";

const EXECUTION_COLUMNS: &str = "id, workflow_id, status, started_at, completed_at, error_message, execution_log, trigger_data";

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct WorkflowRow {
    id: String,
    user_id: i64,
    name: String,
    description: Option<String>,
    definition: String,
    status: String,
    created_at: String,
    updated_at: String,
    deployed_at: Option<String>,
}

impl WorkflowRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            definition: row.try_get("definition")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deployed_at: row.try_get("deployed_at")?,
        })
    }

    fn into_workflow(self) -> Result<Workflow, RepositoryError> {
        let definition: WorkflowDefinition = serde_json::from_str(&self.definition)
            .map_err(|e| RepositoryError::Query(format!("invalid workflow definition JSON: {e}")))?;
        let status: WorkflowStatus = self.status.parse().map_err(RepositoryError::Query)?;

        Ok(Workflow {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            definition,
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            deployed_at: self.deployed_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

struct ExecutionRow {
    id: i64,
    workflow_id: String,
    status: String,
    started_at: String,
    completed_at: Option<String>,
    error_message: Option<String>,
    execution_log: String,
    trigger_data: String,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            error_message: row.try_get("error_message")?,
            execution_log: row.try_get("execution_log")?,
            trigger_data: row.try_get("trigger_data")?,
        })
    }

    fn into_record(self) -> Result<ExecutionRecord, RepositoryError> {
        let status: ExecutionStatus = self.status.parse().map_err(RepositoryError::Query)?;
        let execution_log: Vec<StepLogEntry> = serde_json::from_str(&self.execution_log)
            .map_err(|e| RepositoryError::Query(format!("invalid execution_log JSON: {e}")))?;
        let trigger_data: serde_json::Value = serde_json::from_str(&self.trigger_data)
            .map_err(|e| RepositoryError::Query(format!("invalid trigger_data JSON: {e}")))?;

        Ok(ExecutionRecord {
            id: self.id,
            workflow_id: parse_uuid(&self.workflow_id)?,
            status,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_datetime).transpose()?,
            error_message: self.error_message,
            execution_log,
            trigger_data,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(format!("serialize {what}: {e}")))
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

fn rows_to_workflows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Workflow>, RepositoryError> {
    rows.iter()
        .map(|row| {
            WorkflowRow::from_row(row)
                .map_err(query_error)
                .and_then(WorkflowRow::into_workflow)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let definition_json = to_json(&workflow.definition, "definition")?;
        let trigger = &workflow.definition.trigger;

        sqlx::query(
            r#"INSERT INTO workflows (id, user_id, name, description, definition, trigger_type, webhook_id, status, created_at, updated_at, deployed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(workflow.id.to_string())
        .bind(workflow.user_id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&definition_json)
        .bind(trigger.kind().as_str())
        .bind(trigger.webhook_id())
        .bind(workflow.status.as_str())
        .bind(format_datetime(&workflow.created_at))
        .bind(format_datetime(&workflow.updated_at))
        .bind(workflow.deployed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("workflow {} already exists", workflow.id))
            }
            other => query_error(other),
        })?;

        Ok(())
    }

    async fn get_workflow(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let r = WorkflowRow::from_row(&row).map_err(query_error)?;
                Ok(Some(r.into_workflow()?))
            }
            None => Ok(None),
        }
    }

    async fn list_workflows(&self, user_id: Option<i64>) -> Result<Vec<Workflow>, RepositoryError> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE user_id = ? ORDER BY created_at DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(query_error)?;

        rows_to_workflows(&rows)
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let definition_json = to_json(&workflow.definition, "definition")?;
        let trigger = &workflow.definition.trigger;

        let result = sqlx::query(
            r#"UPDATE workflows SET
                 user_id = ?, name = ?, description = ?, definition = ?,
                 trigger_type = ?, webhook_id = ?, status = ?,
                 updated_at = ?, deployed_at = ?
               WHERE id = ?"#,
        )
        .bind(workflow.user_id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&definition_json)
        .bind(trigger.kind().as_str())
        .bind(trigger.webhook_id())
        .bind(workflow.status.as_str())
        .bind(format_datetime(&workflow.updated_at))
        .bind(workflow.deployed_at.as_ref().map(format_datetime))
        .bind(workflow.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_workflow(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_workflows_by_trigger(
        &self,
        kind: TriggerKind,
        status: WorkflowStatus,
    ) -> Result<Vec<Workflow>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE trigger_type = ? AND status = ? ORDER BY created_at ASC"
        ))
        .bind(kind.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows_to_workflows(&rows)
    }

    async fn create_execution(&self, execution: &NewExecution) -> Result<i64, RepositoryError> {
        let trigger_json = to_json(&execution.trigger_data, "trigger_data")?;

        let result = sqlx::query(
            r#"INSERT INTO workflow_executions (workflow_id, status, started_at, execution_log, trigger_data)
               VALUES (?, 'running', ?, '[]', ?)"#,
        )
        .bind(execution.workflow_id.to_string())
        .bind(format_datetime(&execution.started_at))
        .bind(&trigger_json)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_execution(
        &self,
        id: i64,
        update: &ExecutionUpdate,
    ) -> Result<(), RepositoryError> {
        let log_json = to_json(&update.execution_log, "execution_log")?;

        let result = sqlx::query(
            r#"UPDATE workflow_executions
               SET status = ?, completed_at = ?, error_message = ?, execution_log = ?
               WHERE id = ?"#,
        )
        .bind(update.status.as_str())
        .bind(format_datetime(&update.completed_at))
        .bind(&update.error_message)
        .bind(&log_json)
        .bind(id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_execution(&self, id: i64) -> Result<Option<ExecutionRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM workflow_executions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row).map_err(query_error)?;
                Ok(Some(r.into_record()?))
            }
            None => Ok(None),
        }
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM workflow_executions WHERE workflow_id = ? ORDER BY started_at DESC, id DESC LIMIT ?"
        ))
        .bind(workflow_id.to_string())
        .bind(clamp_execution_limit(limit) as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                ExecutionRow::from_row(row)
                    .map_err(query_error)
                    .and_then(ExecutionRow::into_record)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
