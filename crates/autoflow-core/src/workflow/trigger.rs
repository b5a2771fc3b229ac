//! Webhook trigger dispatch.
//!
//! `WebhookDispatcher` maps an inbound webhook id to exactly one active
//! webhook-triggered workflow, starts its run in the background and returns
//! an acknowledgment right away. The caller never waits for the run.

use std::sync::Arc;

use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{ExecutionRecord, TriggerKind, Workflow, WorkflowStatus};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::executor::{ExecutionEngine, ExecutorError};
use crate::repository::workflow::WorkflowRepository;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when resolving a trigger.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// No active workflow listens on this webhook id.
    #[error("no active workflow for webhook '{0}'")]
    WebhookNotFound(String),

    /// More than one active workflow listens on this webhook id.
    #[error("webhook '{webhook_id}' matches {count} active workflows")]
    AmbiguousWebhook { webhook_id: String, count: usize },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// WebhookAck
// ---------------------------------------------------------------------------

/// Immediate response to a webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub message: String,
}

/// An acknowledged dispatch together with the handle of the background run.
pub struct Dispatched {
    pub ack: WebhookAck,
    pub run: JoinHandle<Result<ExecutionRecord, ExecutorError>>,
}

// ---------------------------------------------------------------------------
// WebhookDispatcher
// ---------------------------------------------------------------------------

pub struct WebhookDispatcher<R: WorkflowRepository> {
    repo: Arc<R>,
    engine: ExecutionEngine<R>,
}

impl<R: WorkflowRepository + 'static> WebhookDispatcher<R> {
    pub fn new(repo: Arc<R>, engine: ExecutionEngine<R>) -> Self {
        Self { repo, engine }
    }

    /// Find the single active workflow listening on `webhook_id`.
    pub async fn resolve(&self, webhook_id: &str) -> Result<Workflow, TriggerError> {
        let mut matches: Vec<Workflow> = self
            .repo
            .list_workflows_by_trigger(TriggerKind::Webhook, WorkflowStatus::Active)
            .await?
            .into_iter()
            .filter(|w| w.definition.trigger.webhook_id() == Some(webhook_id))
            .collect();

        match matches.len() {
            0 => Err(TriggerError::WebhookNotFound(webhook_id.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(TriggerError::AmbiguousWebhook {
                webhook_id: webhook_id.to_string(),
                count,
            }),
        }
    }

    /// Start the matching workflow with `payload` as trigger data.
    pub async fn dispatch(
        &self,
        webhook_id: &str,
        payload: Option<Value>,
    ) -> Result<Dispatched, TriggerError> {
        let workflow = self.resolve(webhook_id).await?;
        tracing::info!(
            webhook_id,
            workflow_id = %workflow.id,
            "webhook received, dispatching workflow"
        );

        let run = self
            .engine
            .spawn(workflow.definition.clone(), workflow.user_id, payload);

        Ok(Dispatched {
            ack: WebhookAck {
                workflow_id: workflow.id,
                workflow_name: workflow.name,
                message: "Workflow triggered".to_string(),
            },
            run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use autoflow_types::workflow::ExecutionStatus;
    use serde_json::json;

    use crate::testing::{
        webhook_workflow, FakeHttpClient, InMemoryWorkflowRepository, RecordingMailRelay,
    };
    use crate::workflow::step_runner::{StepOptions, StepRunner};
    use crate::workflow::transform::JexlTransformer;

    fn dispatcher(
        repo: Arc<InMemoryWorkflowRepository>,
        http: Arc<FakeHttpClient>,
    ) -> WebhookDispatcher<InMemoryWorkflowRepository> {
        let runner = StepRunner::standard(
            http,
            Arc::new(RecordingMailRelay::new()),
            Arc::new(JexlTransformer::new()),
            StepOptions {
                http_timeout: Duration::from_secs(5),
                ..StepOptions::default()
            },
        );
        let engine = ExecutionEngine::new(repo.clone(), Arc::new(runner));
        WebhookDispatcher::new(repo, engine)
    }

    #[tokio::test]
    async fn test_resolve_not_found_and_inactive() {
        let repo = Arc::new(InMemoryWorkflowRepository::new());
        repo.insert(webhook_workflow("hook-a", WorkflowStatus::Draft));
        let d = dispatcher(repo, Arc::new(FakeHttpClient::ok(json!({}))));

        assert!(matches!(
            d.resolve("hook-a").await,
            Err(TriggerError::WebhookNotFound(id)) if id == "hook-a"
        ));
        assert!(matches!(
            d.resolve("nope").await,
            Err(TriggerError::WebhookNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_ambiguous() {
        let repo = Arc::new(InMemoryWorkflowRepository::new());
        repo.insert(webhook_workflow("shared", WorkflowStatus::Active));
        repo.insert(webhook_workflow("shared", WorkflowStatus::Active));
        let d = dispatcher(repo, Arc::new(FakeHttpClient::ok(json!({}))));

        assert!(matches!(
            d.resolve("shared").await,
            Err(TriggerError::AmbiguousWebhook { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_dispatch_acks_before_run_completes() {
        let repo = Arc::new(InMemoryWorkflowRepository::new());
        let mut wf = webhook_workflow("slow-hook", WorkflowStatus::Active);
        wf.definition.steps = vec![crate::testing::step(
            "call",
            "http_request",
            json!({"url": "https://slow.example.com"}),
        )];
        repo.insert(wf.clone());
        let d = dispatcher(repo.clone(), Arc::new(FakeHttpClient::hanging()));

        let dispatched = d.dispatch("slow-hook", Some(json!({"a": 1}))).await.unwrap();
        assert_eq!(dispatched.ack.workflow_id, wf.id);
        assert_eq!(dispatched.ack.workflow_name, wf.name);

        // The run is still blocked inside the hanging HTTP call.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!dispatched.run.is_finished());
        let records = repo.executions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ExecutionStatus::Running);
        assert_eq!(records[0].trigger_data, json!({"a": 1}));
        dispatched.run.abort();
    }

    #[tokio::test]
    async fn test_dispatch_passes_payload_as_trigger_data() {
        let repo = Arc::new(InMemoryWorkflowRepository::new());
        repo.insert(webhook_workflow("orders", WorkflowStatus::Active));
        let d = dispatcher(repo, Arc::new(FakeHttpClient::ok(json!({}))));

        let dispatched = d
            .dispatch("orders", Some(json!({"items": [3, 4]})))
            .await
            .unwrap();
        let record = dispatched.run.await.unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(
            record.execution_log[0].result,
            Some(json!({"operation": "map", "result": [3, 4]}))
        );
    }
}
