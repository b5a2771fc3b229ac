//! In-memory doubles for the repository and the outbound ports.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{
    ExecutionRecord, ExecutionStatus, ExecutionUpdate, HttpRequestConfig, NewExecution, Trigger,
    TriggerKind, TransformOperation, Workflow, WorkflowDefinition, WorkflowStatus, WorkflowStep,
};
use chrono::Utc;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::repository::workflow::{clamp_execution_limit, WorkflowRepository};
use crate::workflow::step_runner::{HttpClient, MailMessage, MailReceipt, MailRelay, StepError};
use crate::workflow::transform::Transformer;

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Mutex<Vec<Workflow>>,
    executions: Mutex<Vec<ExecutionRecord>>,
    fail_queries: AtomicBool,
    pause_on_read: Mutex<Option<(Uuid, usize)>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `RepositoryError::Connection`.
    pub fn set_failing(&self, failing: bool) {
        self.fail_queries.store(failing, Ordering::SeqCst);
    }

    pub fn insert(&self, workflow: Workflow) {
        self.workflows.lock().unwrap().push(workflow);
    }

    pub fn set_status(&self, id: &Uuid, status: WorkflowStatus) {
        let mut workflows = self.workflows.lock().unwrap();
        if let Some(w) = workflows.iter_mut().find(|w| w.id == *id) {
            w.status = status;
        }
    }

    /// Pause `id` in the store right after its `reads`-th `get_workflow`,
    /// as a concurrent pause landing between two scheduler steps would.
    pub fn pause_after_reads(&self, id: Uuid, reads: usize) {
        *self.pause_on_read.lock().unwrap() = Some((id, reads));
    }

    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.executions.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        self.check()?;
        let mut workflows = self.workflows.lock().unwrap();
        if workflows.iter().any(|w| w.id == workflow.id) {
            return Err(RepositoryError::Conflict(workflow.id.to_string()));
        }
        workflows.push(workflow.clone());
        Ok(())
    }

    async fn get_workflow(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        self.check()?;
        let found = self
            .workflows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == *id)
            .cloned();

        let mut pause_on_read = self.pause_on_read.lock().unwrap();
        if let Some((target, reads)) = pause_on_read.as_mut()
            && *target == *id
        {
            *reads = reads.saturating_sub(1);
            if *reads == 0 {
                *pause_on_read = None;
                self.set_status(id, WorkflowStatus::Paused);
            }
        }
        Ok(found)
    }

    async fn list_workflows(&self, user_id: Option<i64>) -> Result<Vec<Workflow>, RepositoryError> {
        self.check()?;
        let mut out: Vec<Workflow> = self
            .workflows
            .lock()
            .unwrap()
            .iter()
            .filter(|w| user_id.is_none_or(|u| w.user_id == u))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        self.check()?;
        let mut workflows = self.workflows.lock().unwrap();
        let slot = workflows
            .iter_mut()
            .find(|w| w.id == workflow.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = workflow.clone();
        Ok(())
    }

    async fn delete_workflow(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut workflows = self.workflows.lock().unwrap();
        let before = workflows.len();
        workflows.retain(|w| w.id != *id);
        self.executions
            .lock()
            .unwrap()
            .retain(|e| e.workflow_id != *id);
        Ok(workflows.len() != before)
    }

    async fn list_workflows_by_trigger(
        &self,
        kind: TriggerKind,
        status: WorkflowStatus,
    ) -> Result<Vec<Workflow>, RepositoryError> {
        self.check()?;
        Ok(self
            .workflows
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.definition.trigger.kind() == kind && w.status == status)
            .cloned()
            .collect())
    }

    async fn create_execution(&self, execution: &NewExecution) -> Result<i64, RepositoryError> {
        self.check()?;
        let mut executions = self.executions.lock().unwrap();
        let id = executions.len() as i64 + 1;
        executions.push(ExecutionRecord {
            id,
            workflow_id: execution.workflow_id,
            status: ExecutionStatus::Running,
            started_at: execution.started_at,
            completed_at: None,
            error_message: None,
            execution_log: Vec::new(),
            trigger_data: execution.trigger_data.clone(),
        });
        Ok(id)
    }

    async fn update_execution(
        &self,
        id: i64,
        update: &ExecutionUpdate,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        let mut executions = self.executions.lock().unwrap();
        let record = executions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = update.status;
        record.completed_at = Some(update.completed_at);
        record.error_message = update.error_message.clone();
        record.execution_log = update.execution_log.clone();
        Ok(())
    }

    async fn get_execution(&self, id: i64) -> Result<Option<ExecutionRecord>, RepositoryError> {
        self.check()?;
        Ok(self
            .executions
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        self.check()?;
        let mut out: Vec<ExecutionRecord> = self
            .executions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.workflow_id == *workflow_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        out.truncate(clamp_execution_limit(limit) as usize);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn step(id: &str, step_type: &str, config: Value) -> WorkflowStep {
    WorkflowStep {
        id: id.to_string(),
        step_type: step_type.to_string(),
        config,
    }
}

pub fn definition(trigger: Trigger, steps: Vec<WorkflowStep>) -> WorkflowDefinition {
    WorkflowDefinition {
        id: Uuid::now_v7(),
        name: "test-flow".to_string(),
        trigger,
        steps,
    }
}

pub fn workflow(definition: WorkflowDefinition, status: WorkflowStatus) -> Workflow {
    let now = Utc::now();
    Workflow {
        id: definition.id,
        user_id: 1,
        name: definition.name.clone(),
        description: None,
        definition,
        status,
        created_at: now,
        updated_at: now,
        deployed_at: None,
    }
}

pub fn scheduled_workflow(cron: &str, status: WorkflowStatus) -> Workflow {
    workflow(
        definition(
            Trigger::Schedule {
                cron: cron.to_string(),
            },
            vec![step("t", "transform_data", json!({"operation": "map", "expression": "item", "input": []}))],
        ),
        status,
    )
}

pub fn webhook_workflow(webhook_id: &str, status: WorkflowStatus) -> Workflow {
    workflow(
        definition(
            Trigger::Webhook {
                webhook_id: webhook_id.to_string(),
            },
            vec![step("t", "transform_data", json!({"operation": "map", "expression": "item", "input": "{{trigger.data.items}}"}))],
        ),
        status,
    )
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

enum HttpBehavior {
    Respond(Value),
    Fail(String),
    Hang,
}

pub struct FakeHttpClient {
    behavior: HttpBehavior,
    calls: AtomicUsize,
    last: Mutex<Option<HttpRequestConfig>>,
}

impl FakeHttpClient {
    fn with(behavior: HttpBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn ok(response: Value) -> Self {
        Self::with(HttpBehavior::Respond(response))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(HttpBehavior::Fail(message.to_string()))
    }

    /// Never completes; only a timeout gets the caller out.
    pub fn hanging() -> Self {
        Self::with(HttpBehavior::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<HttpRequestConfig> {
        self.last.lock().unwrap().clone()
    }
}

impl HttpClient for FakeHttpClient {
    fn send(&self, request: HttpRequestConfig) -> BoxFuture<'_, Result<Value, StepError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request);
        Box::pin(async move {
            match &self.behavior {
                HttpBehavior::Respond(v) => Ok(v.clone()),
                HttpBehavior::Fail(m) => Err(StepError::Http(m.clone())),
                HttpBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(StepError::Http("unreachable".to_string()))
                }
            }
        })
    }
}

#[derive(Default)]
pub struct RecordingMailRelay {
    sent: Mutex<Vec<MailMessage>>,
    failure: Option<String>,
}

impl RecordingMailRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailRelay for RecordingMailRelay {
    fn send(&self, message: MailMessage) -> BoxFuture<'_, Result<MailReceipt, StepError>> {
        Box::pin(async move {
            if let Some(m) = &self.failure {
                return Err(StepError::Mail(m.clone()));
            }
            let mut sent = self.sent.lock().unwrap();
            let receipt = MailReceipt {
                message_id: format!("<{}@test>", sent.len() + 1),
                accepted: vec![message.to.clone()],
            };
            sent.push(message);
            Ok(receipt)
        })
    }
}

/// Returns its input untouched, whatever the operation.
pub struct StaticTransformer;

impl StaticTransformer {
    pub fn echo() -> Self {
        Self
    }
}

impl Transformer for StaticTransformer {
    fn apply(
        &self,
        _operation: TransformOperation,
        _expression: &str,
        input: &Value,
        _initial: Option<&Value>,
    ) -> Result<Value, StepError> {
        Ok(input.clone())
    }
}
