//! Workflow lifecycle service.
//!
//! Orchestrates the store, the scheduler and the execution engine for the
//! API and CLI: create/update (validated), deploy and pause (which drive the
//! scheduler), manual runs, and execution history.

use std::sync::Arc;

use autoflow_types::error::{RepositoryError, WorkflowError};
use autoflow_types::workflow::{
    CreateWorkflowRequest, ExecutionRecord, Trigger, UpdateWorkflowRequest, Workflow,
    WorkflowStatus,
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;
use crate::workflow::definition::validate_definition;
use crate::workflow::executor::{ExecutionEngine, ExecutorError};
use crate::workflow::scheduler::{Scheduler, SchedulerError};

/// Page size used when a caller does not ask for one.
pub const DEFAULT_EXECUTION_PAGE: u32 = 50;

impl From<ExecutorError> for WorkflowError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::Repository(inner) => WorkflowError::Repository(inner),
        }
    }
}

impl From<SchedulerError> for WorkflowError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Repository(inner) => WorkflowError::Repository(inner),
            other => WorkflowError::Validation(other.to_string()),
        }
    }
}

/// Service owning the workflow lifecycle.
pub struct WorkflowService<R: WorkflowRepository> {
    repo: Arc<R>,
    engine: ExecutionEngine<R>,
    scheduler: Arc<Scheduler<R>>,
    public_base_url: String,
}

impl<R: WorkflowRepository + 'static> WorkflowService<R> {
    /// Create a new WorkflowService.
    ///
    /// - `public_base_url`: externally reachable base used for webhook URLs
    pub fn new(
        repo: Arc<R>,
        engine: ExecutionEngine<R>,
        scheduler: Arc<Scheduler<R>>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            engine,
            scheduler,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a `draft` workflow owned by `user_id`.
    pub async fn create(
        &self,
        user_id: i64,
        request: CreateWorkflowRequest,
    ) -> Result<Workflow, WorkflowError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(WorkflowError::Validation("name cannot be empty".to_string()));
        }

        let id = Uuid::now_v7();
        let definition = request.workflow.into_definition(id, &name);
        validate_definition(&definition)?;

        let now = Utc::now();
        let workflow = Workflow {
            id,
            user_id,
            name,
            description: request.description,
            definition,
            status: WorkflowStatus::Draft,
            created_at: now,
            updated_at: now,
            deployed_at: None,
        };
        self.repo.create_workflow(&workflow).await?;

        tracing::info!(workflow_id = %id, user_id, "workflow created");
        Ok(workflow)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Workflow, WorkflowError> {
        self.repo
            .get_workflow(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    pub async fn list(&self, user_id: Option<i64>) -> Result<Vec<Workflow>, WorkflowError> {
        Ok(self.repo.list_workflows(user_id).await?)
    }

    /// Apply an update and bring the scheduler in line with the result.
    pub async fn update(
        &self,
        id: &Uuid,
        request: UpdateWorkflowRequest,
    ) -> Result<Workflow, WorkflowError> {
        let mut workflow = self.get(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(WorkflowError::Validation("name cannot be empty".to_string()));
            }
            workflow.name = name;
        }
        if let Some(description) = request.description {
            workflow.description = Some(description);
        }
        if let Some(document) = request.workflow {
            workflow.definition = document.into_definition(workflow.id, &workflow.name);
        }
        validate_definition(&workflow.definition)?;

        workflow.updated_at = Utc::now();
        self.save(&workflow).await?;
        self.sync_schedule(&workflow).await?;

        tracing::info!(workflow_id = %id, "workflow updated");
        Ok(workflow)
    }

    /// Activate a workflow. Schedule-triggered workflows are queued right away.
    pub async fn deploy(&self, id: &Uuid) -> Result<Workflow, WorkflowError> {
        let mut workflow = self.get(id).await?;
        let now = Utc::now();
        workflow.status = WorkflowStatus::Active;
        workflow.deployed_at = Some(now);
        workflow.updated_at = now;
        self.save(&workflow).await?;
        self.sync_schedule(&workflow).await?;

        tracing::info!(workflow_id = %id, trigger = %workflow.definition.trigger.kind(), "workflow deployed");
        Ok(workflow)
    }

    /// Pause a workflow and drop its pending jobs.
    pub async fn pause(&self, id: &Uuid) -> Result<Workflow, WorkflowError> {
        let mut workflow = self.get(id).await?;
        workflow.status = WorkflowStatus::Paused;
        workflow.updated_at = Utc::now();
        self.save(&workflow).await?;
        self.scheduler.unschedule_workflow(id).await;

        tracing::info!(workflow_id = %id, "workflow paused");
        Ok(workflow)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), WorkflowError> {
        self.scheduler.unschedule_workflow(id).await;
        if !self.repo.delete_workflow(id).await? {
            return Err(WorkflowError::NotFound(id.to_string()));
        }
        tracing::info!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    /// Run a workflow now, whatever its status, and wait for the record.
    pub async fn execute(
        &self,
        id: &Uuid,
        test_data: Option<Value>,
    ) -> Result<ExecutionRecord, WorkflowError> {
        let workflow = self.get(id).await?;
        tracing::info!(workflow_id = %id, "manual execution requested");
        Ok(self
            .engine
            .execute(&workflow.definition, workflow.user_id, test_data)
            .await?)
    }

    /// Execution history of a workflow, newest first.
    pub async fn list_executions(
        &self,
        id: &Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<ExecutionRecord>, WorkflowError> {
        self.get(id).await?;
        Ok(self
            .repo
            .list_executions(id, limit.unwrap_or(DEFAULT_EXECUTION_PAGE))
            .await?)
    }

    pub async fn get_execution(&self, execution_id: i64) -> Result<ExecutionRecord, WorkflowError> {
        self.repo
            .get_execution(execution_id)
            .await?
            .ok_or(WorkflowError::ExecutionNotFound(execution_id))
    }

    /// The URL external systems should POST to for a webhook workflow.
    pub async fn webhook_url(&self, id: &Uuid) -> Result<String, WorkflowError> {
        let workflow = self.get(id).await?;
        match &workflow.definition.trigger {
            Trigger::Webhook { webhook_id } => Ok(format!(
                "{}/api/v1/webhooks/{}",
                self.public_base_url, webhook_id
            )),
            _ => Err(WorkflowError::NotWebhookTriggered(id.to_string())),
        }
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        self.repo
            .update_workflow(workflow)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => WorkflowError::NotFound(workflow.id.to_string()),
                other => WorkflowError::Repository(other),
            })
    }

    async fn sync_schedule(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        if workflow.is_active() && workflow.definition.trigger.cron().is_some() {
            self.scheduler.schedule_workflow(workflow).await?;
        } else {
            self.scheduler.unschedule_workflow(&workflow.id).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use autoflow_types::workflow::{ExecutionStatus, WorkflowDocument};
    use serde_json::json;

    use crate::testing::{step, FakeHttpClient, InMemoryWorkflowRepository, RecordingMailRelay};
    use crate::workflow::scheduler::{engine_runner, SchedulerOptions};
    use crate::workflow::step_runner::{StepOptions, StepRunner};
    use crate::workflow::transform::JexlTransformer;

    struct Harness {
        service: WorkflowService<InMemoryWorkflowRepository>,
        scheduler: Arc<Scheduler<InMemoryWorkflowRepository>>,
    }

    fn harness() -> Harness {
        let repo = Arc::new(InMemoryWorkflowRepository::new());
        let runner = StepRunner::standard(
            Arc::new(FakeHttpClient::ok(json!({"status": 200, "headers": {}, "data": {}}))),
            Arc::new(RecordingMailRelay::new()),
            Arc::new(JexlTransformer::new()),
            StepOptions {
                http_timeout: Duration::from_secs(1),
                ..StepOptions::default()
            },
        );
        let engine = ExecutionEngine::new(repo.clone(), Arc::new(runner));
        let scheduler = Arc::new(Scheduler::new(
            repo.clone(),
            engine_runner(engine.clone()),
            SchedulerOptions::default(),
        ));
        let service = WorkflowService::new(repo, engine, scheduler.clone(), "https://flows.example.com/");
        Harness { service, scheduler }
    }

    fn request(trigger: Trigger) -> CreateWorkflowRequest {
        CreateWorkflowRequest {
            name: "sync".to_string(),
            description: Some("nightly sync".to_string()),
            workflow: WorkflowDocument {
                name: None,
                trigger,
                steps: vec![step("s1", "transform_data", json!({"operation": "map", "expression": "item + 1", "input": [1, 2]}))],
            },
        }
    }

    fn every_minute() -> Trigger {
        Trigger::Schedule {
            cron: "* * * * *".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let h = harness();
        let wf = h.service.create(3, request(Trigger::Manual)).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Draft);
        assert_eq!(wf.user_id, 3);
        assert_eq!(wf.definition.id, wf.id);
        assert_eq!(wf.definition.name, "sync");
        assert_eq!(h.service.get(&wf.id).await.unwrap(), wf);
        assert_eq!(h.service.list(Some(3)).await.unwrap().len(), 1);
        assert!(h.service.list(Some(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_definition() {
        let h = harness();
        let mut req = request(Trigger::Schedule {
            cron: "bogus".to_string(),
        });
        assert!(matches!(
            h.service.create(1, req.clone()).await,
            Err(WorkflowError::Validation(_))
        ));
        req.workflow.trigger = Trigger::Manual;
        req.workflow.steps.clear();
        assert!(matches!(
            h.service.create(1, req).await,
            Err(WorkflowError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_deploy_schedules_and_pause_unschedules() {
        let h = harness();
        let wf = h.service.create(1, request(every_minute())).await.unwrap();
        assert!(h.scheduler.pending_jobs().await.is_empty());

        let deployed = h.service.deploy(&wf.id).await.unwrap();
        assert_eq!(deployed.status, WorkflowStatus::Active);
        assert!(deployed.deployed_at.is_some());
        let jobs = h.scheduler.pending_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].workflow_id, wf.id);

        let paused = h.service.pause(&wf.id).await.unwrap();
        assert_eq!(paused.status, WorkflowStatus::Paused);
        assert!(h.scheduler.pending_jobs().await.is_empty());

        let report = h.scheduler.reconcile().await.unwrap();
        assert_eq!(report.scheduled, 0);
        assert!(h.scheduler.pending_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_to_manual_trigger_unschedules() {
        let h = harness();
        let wf = h.service.create(1, request(every_minute())).await.unwrap();
        h.service.deploy(&wf.id).await.unwrap();
        assert_eq!(h.scheduler.pending_jobs().await.len(), 1);

        let updated = h
            .service
            .update(
                &wf.id,
                UpdateWorkflowRequest {
                    name: Some("sync-v2".to_string()),
                    workflow: Some(WorkflowDocument {
                        name: None,
                        trigger: Trigger::Manual,
                        steps: wf.definition.steps.clone(),
                    }),
                    ..UpdateWorkflowRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "sync-v2");
        assert_eq!(updated.definition.name, "sync-v2");
        assert_eq!(updated.status, WorkflowStatus::Active);
        assert!(h.scheduler.pending_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unschedules() {
        let h = harness();
        let wf = h.service.create(1, request(every_minute())).await.unwrap();
        h.service.deploy(&wf.id).await.unwrap();
        h.service.delete(&wf.id).await.unwrap();

        assert!(h.scheduler.pending_jobs().await.is_empty());
        assert!(matches!(h.service.get(&wf.id).await, Err(WorkflowError::NotFound(_))));
        assert!(matches!(h.service.delete(&wf.id).await, Err(WorkflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_execute_and_history() {
        let h = harness();
        let wf = h.service.create(1, request(Trigger::Manual)).await.unwrap();

        let record = h.service.execute(&wf.id, Some(json!({"test": true}))).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.trigger_data, json!({"test": true}));
        assert_eq!(
            record.execution_log[0].result,
            Some(json!({"operation": "map", "result": [2, 3]}))
        );

        h.service.execute(&wf.id, None).await.unwrap();
        let history = h.service.list_executions(&wf.id, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(h.service.list_executions(&wf.id, Some(1)).await.unwrap().len(), 1);

        assert_eq!(h.service.get_execution(record.id).await.unwrap().id, record.id);
        assert!(matches!(
            h.service.get_execution(9999).await,
            Err(WorkflowError::ExecutionNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn test_webhook_url() {
        let h = harness();
        let hook = h
            .service
            .create(
                1,
                request(Trigger::Webhook {
                    webhook_id: "orders".to_string(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(
            h.service.webhook_url(&hook.id).await.unwrap(),
            "https://flows.example.com/api/v1/webhooks/orders"
        );

        let manual = h.service.create(1, request(Trigger::Manual)).await.unwrap();
        assert!(matches!(
            h.service.webhook_url(&manual.id).await,
            Err(WorkflowError::NotWebhookTriggered(_))
        ));
    }
}
