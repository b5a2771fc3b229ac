//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Core services are generic over the repository trait; AppState pins them to
//! the SQLite implementation and plugs in the live transports.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use autoflow_core::service::workflow::WorkflowService;
use autoflow_core::workflow::executor::ExecutionEngine;
use autoflow_core::workflow::scheduler::{engine_runner, Scheduler, SchedulerOptions};
use autoflow_core::workflow::step_runner::{StepOptions, StepRunner};
use autoflow_core::workflow::transform::JexlTransformer;
use autoflow_core::workflow::trigger::WebhookDispatcher;
use autoflow_infra::config::{database_url, load_config, resolve_data_dir};
use autoflow_infra::sqlite::pool::DatabasePool;
use autoflow_infra::sqlite::workflow::SqliteWorkflowRepository;
use autoflow_infra::workflow::http_client::ReqwestHttpClient;
use autoflow_infra::workflow::mail_relay::mail_relay_from_config;
use autoflow_types::config::AppConfig;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcreteWorkflowService = WorkflowService<SqliteWorkflowRepository>;
pub type ConcreteScheduler = Scheduler<SqliteWorkflowRepository>;
pub type ConcreteDispatcher = WebhookDispatcher<SqliteWorkflowRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<ConcreteWorkflowService>,
    pub scheduler: Arc<ConcreteScheduler>,
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir, config_path).await;
        Self::from_config(config, &data_dir).await
    }

    /// Wire services for an already-loaded configuration.
    pub async fn from_config(config: AppConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let db_url = database_url(&config, data_dir);
        let db_pool = DatabasePool::connect(&db_url).await?;
        let repo = Arc::new(SqliteWorkflowRepository::new(db_pool));

        let http_timeout = Duration::from_secs(config.http.timeout_secs.max(1));
        let http = ReqwestHttpClient::new(http_timeout, &config.http.user_agent)?;
        let relay_client = reqwest::Client::builder()
            .timeout(http_timeout)
            .user_agent(config.http.user_agent.as_str())
            .build()?;
        let mail = mail_relay_from_config(&config.mail, relay_client, http_timeout)?;

        let runner = StepRunner::standard(
            Arc::new(http),
            mail,
            Arc::new(JexlTransformer::new()),
            StepOptions {
                http_timeout,
                mail_from: config.mail.from_address.clone(),
            },
        );
        let engine = ExecutionEngine::new(repo.clone(), Arc::new(runner));

        let scheduler = Arc::new(Scheduler::new(
            repo.clone(),
            engine_runner(engine.clone()),
            SchedulerOptions::from(&config.scheduler),
        ));
        let dispatcher = WebhookDispatcher::new(repo.clone(), engine.clone());
        let workflow_service = WorkflowService::new(
            repo,
            engine,
            scheduler.clone(),
            config.server.base_url(),
        );

        Ok(Self {
            workflow_service: Arc::new(workflow_service),
            scheduler,
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        })
    }
}
