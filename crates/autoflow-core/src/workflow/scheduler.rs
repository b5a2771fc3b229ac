//! Delayed-job scheduler for schedule-triggered workflows.
//!
//! The scheduler keeps an in-memory queue of [`ScheduledJob`]s ordered by
//! `run_at` and keyed by `(workflow_id, run_at)`. Three things feed it:
//!
//! - **Reconciliation** derives the next fire time of every active
//!   schedule-triggered workflow from the store. It runs once on `start` and
//!   then on a `tokio-cron-scheduler` repeated job every `reconcile_interval`.
//! - **Reschedule after fire**: as soon as a job is dispatched the workflow is
//!   re-read and its following occurrence queued, so crons shorter than the
//!   reconcile interval keep firing on time.
//! - Explicit `schedule_workflow` / `unschedule_workflow` calls from the
//!   lifecycle service.
//!
//! A single worker task sleeps until the earliest job is due (or the queue
//! changes, or shutdown) and dispatches due jobs with bounded concurrency.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use autoflow_types::config::SchedulerConfig;
use autoflow_types::error::RepositoryError;
use autoflow_types::workflow::{TriggerKind, Workflow, WorkflowDefinition, WorkflowStatus};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::executor::ExecutionEngine;
use crate::repository::workflow::WorkflowRepository;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid cron expression, or one with no upcoming occurrence.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The workflow does not have a schedule trigger.
    #[error("workflow {0} is not schedule-triggered")]
    NotScheduled(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Failed to create, start or stop the reconcile job.
    #[error("scheduler error: {0}")]
    JobError(String),
}

// ---------------------------------------------------------------------------
// Cron helpers
// ---------------------------------------------------------------------------

/// Normalize a cron expression to the six-field (with seconds) form.
///
/// Five-field expressions get a `0` seconds field prepended; six-field
/// expressions are returned trimmed.
pub fn normalize_schedule(input: &str) -> Result<String, SchedulerError> {
    let trimmed = input.trim();
    match trimmed.split_whitespace().count() {
        5 => Ok(format!("0 {trimmed}")),
        6 => Ok(trimmed.to_string()),
        n => Err(SchedulerError::InvalidSchedule(format!(
            "'{trimmed}' has {n} fields, expected 5 or 6"
        ))),
    }
}

/// The first occurrence of `cron` strictly after `after`.
pub fn next_fire_after(cron: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, SchedulerError> {
    let expr = normalize_schedule(cron)?;
    let parsed = expr
        .parse::<croner::Cron>()
        .map_err(|e| SchedulerError::InvalidSchedule(format!("'{cron}': {e}")))?;
    parsed
        .iter_after(after)
        .next()
        .filter(|next| *next > after)
        .ok_or_else(|| SchedulerError::InvalidSchedule(format!("'{cron}' never fires")))
}

// ---------------------------------------------------------------------------
// Jobs and queue
// ---------------------------------------------------------------------------

/// Identity of a pending job. Orders by `run_at` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey {
    pub run_at: DateTime<Utc>,
    pub workflow_id: Uuid,
}

impl JobKey {
    /// Stable textual job id, `<workflow_id>-<run_at millis>`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.workflow_id, self.run_at.timestamp_millis())
    }
}

/// A pending run of a schedule-triggered workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub workflow_id: Uuid,
    pub user_id: i64,
    pub run_at: DateTime<Utc>,
    /// Definition as it was when the job was queued.
    pub definition: WorkflowDefinition,
}

impl ScheduledJob {
    pub fn key(&self) -> JobKey {
        JobKey {
            run_at: self.run_at,
            workflow_id: self.workflow_id,
        }
    }
}

/// In-memory pending-job queue ordered by `run_at`.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<BTreeMap<JobKey, ScheduledJob>>,
    changed: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job. Returns `false` (and changes nothing) if the key is present.
    pub async fn enqueue(&self, job: ScheduledJob) -> bool {
        let mut jobs = self.jobs.lock().await;
        let key = job.key();
        if jobs.contains_key(&key) {
            return false;
        }
        jobs.insert(key, job);
        drop(jobs);
        self.changed.notify_one();
        true
    }

    /// Make `job` the only pending job of its workflow.
    ///
    /// Returns `true` if the job was newly added, `false` if it was already
    /// pending.
    pub async fn replace_for_workflow(&self, job: ScheduledJob) -> bool {
        let mut jobs = self.jobs.lock().await;
        let key = job.key();
        jobs.retain(|k, _| k.workflow_id != key.workflow_id || *k == key);
        if jobs.contains_key(&key) {
            return false;
        }
        jobs.insert(key, job);
        drop(jobs);
        self.changed.notify_one();
        true
    }

    /// Remove every pending job of a workflow. Returns how many were removed.
    pub async fn remove_workflow(&self, workflow_id: &Uuid) -> usize {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|k, _| k.workflow_id != *workflow_id);
        before - jobs.len()
    }

    /// Remove jobs whose workflow is not in `keep`. Returns how many were removed.
    pub async fn retain_workflows(&self, keep: &[Uuid]) -> usize {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|k, _| keep.contains(&k.workflow_id));
        before - jobs.len()
    }

    /// Take the earliest job with `run_at <= now`, if any.
    pub async fn pop_next_due(&self, now: DateTime<Utc>) -> Option<ScheduledJob> {
        let mut jobs = self.jobs.lock().await;
        let entry = jobs.first_entry()?;
        if entry.key().run_at > now {
            return None;
        }
        Some(entry.remove())
    }

    pub async fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.jobs.lock().await.keys().next().map(|k| k.run_at)
    }

    pub async fn snapshot(&self) -> Vec<ScheduledJob> {
        self.jobs.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn changed(&self) {
        self.changed.notified().await
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Callback that performs the run for a dispatched job.
pub type JobRunner =
    Arc<dyn Fn(ScheduledJob) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Build a [`JobRunner`] that executes jobs through the execution engine.
///
/// A run that ends `failed` is a normal outcome; only store errors are
/// reported back to the worker.
pub fn engine_runner<R: WorkflowRepository + 'static>(engine: ExecutionEngine<R>) -> JobRunner {
    Arc::new(move |job: ScheduledJob| {
        let engine = engine.clone();
        Box::pin(async move {
            engine
                .execute(&job.definition, job.user_id, None)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
    })
}

/// Scheduler tuning, usually built from [`SchedulerConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub reconcile_interval: Duration,
    pub worker_concurrency: usize,
    pub idle_poll: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            reconcile_interval: Duration::from_secs(config.reconcile_interval_secs.max(1)),
            worker_concurrency: config.worker_concurrency.max(1),
            idle_poll: Duration::from_secs(config.idle_poll_secs.max(1)),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Jobs newly queued.
    pub scheduled: usize,
    /// Workflows whose next job was already pending.
    pub unchanged: usize,
    /// Workflows skipped because their cron could not be used.
    pub skipped: usize,
    /// Stale jobs dropped for workflows no longer active and scheduled.
    pub removed: usize,
}

/// Per-workflow state: unscheduled -> pending -> dispatched -> (re)pending,
/// or pending -> superseded by a newer job for the same workflow.
pub struct Scheduler<R: WorkflowRepository> {
    repo: Arc<R>,
    runner: JobRunner,
    queue: JobQueue,
    options: SchedulerOptions,
    cron: RwLock<Option<JobScheduler>>,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl<R: WorkflowRepository + 'static> Scheduler<R> {
    pub fn new(repo: Arc<R>, runner: JobRunner, options: SchedulerOptions) -> Self {
        Self {
            repo,
            runner,
            queue: JobQueue::new(),
            options,
            cron: RwLock::new(None),
            running: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Snapshot of the pending jobs, earliest first.
    pub async fn pending_jobs(&self) -> Vec<ScheduledJob> {
        self.queue.snapshot().await
    }

    /// Queue the next occurrence of a schedule-triggered workflow, replacing
    /// any other pending job for it. Returns the key and whether it was new.
    pub async fn schedule_workflow(
        &self,
        workflow: &Workflow,
    ) -> Result<(JobKey, bool), SchedulerError> {
        self.schedule_after(workflow, Utc::now()).await
    }

    async fn schedule_after(
        &self,
        workflow: &Workflow,
        after: DateTime<Utc>,
    ) -> Result<(JobKey, bool), SchedulerError> {
        let cron = workflow
            .definition
            .trigger
            .cron()
            .ok_or(SchedulerError::NotScheduled(workflow.id))?;
        let run_at = next_fire_after(cron, after)?;

        let job = ScheduledJob {
            workflow_id: workflow.id,
            user_id: workflow.user_id,
            run_at,
            definition: workflow.definition.clone(),
        };
        let key = job.key();
        let added = self.queue.replace_for_workflow(job).await;
        if added {
            tracing::debug!(workflow_id = %workflow.id, job_id = %key.id(), %run_at, "job scheduled");
        }
        Ok((key, added))
    }

    /// Remove every pending job of a workflow.
    pub async fn unschedule_workflow(&self, workflow_id: &Uuid) -> usize {
        let removed = self.queue.remove_workflow(workflow_id).await;
        if removed > 0 {
            tracing::info!(%workflow_id, removed, "workflow unscheduled");
        }
        removed
    }

    /// Rebuild the queue from the store.
    ///
    /// A bad cron skips only its workflow. A store error fails the pass and
    /// leaves the queue untouched.
    pub async fn reconcile(&self) -> Result<ReconcileReport, SchedulerError> {
        let workflows = self
            .repo
            .list_workflows_by_trigger(TriggerKind::Schedule, WorkflowStatus::Active)
            .await?;

        let now = Utc::now();
        let mut report = ReconcileReport::default();
        let mut keep = Vec::with_capacity(workflows.len());

        for workflow in &workflows {
            keep.push(workflow.id);
            match self.schedule_after(workflow, now).await {
                Ok((_, true)) => report.scheduled += 1,
                Ok((_, false)) => report.unchanged += 1,
                Err(e) => {
                    tracing::warn!(workflow_id = %workflow.id, error = %e, "skipping workflow during reconcile");
                    report.skipped += 1;
                }
            }
        }
        report.removed = self.queue.retain_workflows(&keep).await;

        tracing::info!(
            scheduled = report.scheduled,
            unchanged = report.unchanged,
            skipped = report.skipped,
            removed = report.removed,
            "reconcile pass complete"
        );
        Ok(report)
    }

    async fn reconcile_logged(&self) {
        if let Err(e) = self.reconcile().await {
            tracing::error!(error = %e, "reconcile pass failed, retrying next tick");
        }
    }

    /// Reconcile once, start the worker and the periodic reconcile job.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(SchedulerError::JobError("scheduler already running".to_string()));
        }

        self.reconcile_logged().await;

        let cron = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        let weak: Weak<Self> = Arc::downgrade(self);
        let tick = Job::new_repeated_async(self.options.reconcile_interval, move |_uuid, _lock| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.reconcile_logged().await;
                }
            })
        })
        .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        cron.add(tick)
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        cron.start()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        *self.cron.write().await = Some(cron);

        let token = CancellationToken::new();
        let worker = tokio::spawn(Arc::clone(self).run_worker(token.clone()));
        *running = Some((token, worker));

        tracing::info!(
            reconcile_interval_secs = self.options.reconcile_interval.as_secs(),
            worker_concurrency = self.options.worker_concurrency,
            "scheduler started"
        );
        Ok(())
    }

    /// Stop the worker and the reconcile job. Pending jobs stay queued.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if let Some((token, worker)) = self.running.lock().await.take() {
            token.cancel();
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "scheduler worker ended abnormally");
            }
        }
        if let Some(mut cron) = self.cron.write().await.take() {
            cron.shutdown()
                .await
                .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        }
        tracing::info!("scheduler stopped");
        Ok(())
    }

    async fn run_worker(self: Arc<Self>, cancel: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.options.worker_concurrency.max(1)));

        loop {
            // A job leaves the queue only once a slot is free, so anything
            // still waiting stays visible to `pending_jobs` and `unschedule_workflow`.
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            let Ok(permit) = permit else { break };

            if let Some(job) = self.queue.pop_next_due(Utc::now()).await {
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    scheduler.fire(job).await;
                    drop(permit);
                });
                continue;
            }
            drop(permit);

            let wait = match self.queue.next_run_at().await {
                Some(run_at) => (run_at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.options.idle_poll),
                None => self.options.idle_poll,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.queue.changed() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
        tracing::debug!("scheduler worker exited");
    }

    /// Dispatch one job, queue its successor, then wait for the run.
    async fn fire(&self, job: ScheduledJob) {
        let workflow_id = job.workflow_id;
        let job_id = job.key().id();
        tracing::info!(%workflow_id, %job_id, "scheduled job dispatched");

        let run = tokio::spawn((self.runner)(job.clone()));
        self.reschedule_after_fire(&job).await;

        match run.await {
            Ok(Ok(())) => tracing::debug!(%workflow_id, %job_id, "scheduled run finished"),
            Ok(Err(e)) => tracing::error!(%workflow_id, %job_id, error = %e, "scheduled run failed"),
            Err(e) => tracing::error!(%workflow_id, %job_id, error = %e, "scheduled run panicked"),
        }
    }

    async fn reschedule_after_fire(&self, job: &ScheduledJob) {
        let workflow = match self.load_scheduled(&job.workflow_id).await {
            Ok(Some(w)) => w,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(workflow_id = %job.workflow_id, error = %e, "cannot reschedule, reconcile will retry");
                return;
            }
        };
        let after = job.run_at.max(Utc::now());
        if let Err(e) = self.schedule_after(&workflow, after).await {
            tracing::warn!(workflow_id = %workflow.id, error = %e, "cannot reschedule workflow");
            return;
        }

        // Pause and delete save first and unschedule second. One that saved
        // between the read above and the enqueue would otherwise miss this job.
        if let Ok(None) = self.load_scheduled(&workflow.id).await {
            let removed = self.queue.remove_workflow(&workflow.id).await;
            tracing::debug!(workflow_id = %workflow.id, removed, "workflow left schedule during reschedule");
        }
    }

    /// The workflow, if it still exists and is active and schedule-triggered.
    async fn load_scheduled(&self, workflow_id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self.repo.get_workflow(workflow_id).await?.filter(|w| {
            w.is_active() && w.definition.trigger.kind() == TriggerKind::Schedule
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
