//! Step dispatch for the three workflow step kinds.
//!
//! `StepRunner` owns a table from [`StepKind`] to [`StepHandler`]. Running a
//! step parses its `type`, looks up the handler, resolves the config's
//! templates against the execution context, and invokes the handler. An
//! unrecognized `type` fails before any resolution or side effect.
//!
//! Side effects leave the process through two ports implemented in
//! autoflow-infra: [`HttpClient`] for `http_request` and [`MailRelay`] for
//! `send_email`. `transform_data` delegates to a [`Transformer`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use autoflow_types::workflow::{
    HttpRequestConfig, SendEmailConfig, StepKind, TransformDataConfig, TransformOperation,
    WorkflowStep,
};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::context::ExecutionContext;
use super::template::resolve_config;
use super::transform::Transformer;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default bound on a single `http_request` step.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// StepError
// ---------------------------------------------------------------------------

/// Errors that can occur while running a single step.
///
/// Every variant is a step failure: the engine records the message in the
/// execution log and stops the run.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("unknown step type: {0}")]
    UnknownStepType(String),

    #[error("unknown transform operation: {0}")]
    UnknownOperation(String),

    #[error("invalid {step_type} config: {message}")]
    InvalidConfig { step_type: StepKind, message: String },

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("email delivery failed: {0}")]
    Mail(String),

    #[error("transform failed: {0}")]
    Transform(String),
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Outbound HTTP transport used by `http_request` steps.
///
/// Implementations return `{status, headers, data}` for 2xx responses and
/// `StepError::Http` for transport errors and non-2xx statuses.
pub trait HttpClient: Send + Sync {
    fn send(&self, request: HttpRequestConfig) -> BoxFuture<'_, Result<Value, StepError>>;
}

/// An email ready to hand to a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

/// What the relay reports back after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailReceipt {
    pub message_id: String,
    #[serde(default)]
    pub accepted: Vec<String>,
}

/// Mail delivery port used by `send_email` steps.
pub trait MailRelay: Send + Sync {
    fn send(&self, message: MailMessage) -> BoxFuture<'_, Result<MailReceipt, StepError>>;
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Executes one kind of step against an already-resolved config.
pub trait StepHandler: Send + Sync {
    fn run<'a>(
        &'a self,
        config: Value,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, StepError>>;
}

fn parse_config<T: DeserializeOwned>(kind: StepKind, config: Value) -> Result<T, StepError> {
    serde_json::from_value(config).map_err(|e| StepError::InvalidConfig {
        step_type: kind,
        message: e.to_string(),
    })
}

/// `http_request`: one outbound call, bounded by `timeout`, no retry.
pub struct HttpRequestHandler {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl HttpRequestHandler {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl StepHandler for HttpRequestHandler {
    fn run<'a>(
        &'a self,
        config: Value,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let request: HttpRequestConfig = parse_config(StepKind::HttpRequest, config)?;
            tracing::debug!(method = %request.method, url = %request.url, "running http_request step");

            tokio::time::timeout(self.timeout, self.client.send(request))
                .await
                .map_err(|_| StepError::Timeout(self.timeout))?
        })
    }
}

/// `send_email`: hand the message to the configured relay.
pub struct SendEmailHandler {
    relay: Arc<dyn MailRelay>,
    from_address: String,
}

impl SendEmailHandler {
    pub fn new(relay: Arc<dyn MailRelay>, from_address: impl Into<String>) -> Self {
        Self {
            relay,
            from_address: from_address.into(),
        }
    }
}

impl StepHandler for SendEmailHandler {
    fn run<'a>(
        &'a self,
        config: Value,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let email: SendEmailConfig = parse_config(StepKind::SendEmail, config)?;
            let message = MailMessage {
                from: self.from_address.clone(),
                to: email.to,
                cc: email.cc,
                bcc: email.bcc,
                subject: email.subject,
                body: email.body,
            };
            tracing::debug!(to = %message.to, "running send_email step");

            let receipt = self.relay.send(message).await?;
            Ok(json!({
                "messageId": receipt.message_id,
                "accepted": receipt.accepted,
            }))
        })
    }
}

/// `transform_data`: apply filter/map/reduce through the configured transformer.
pub struct TransformDataHandler {
    transformer: Arc<dyn Transformer>,
}

impl TransformDataHandler {
    pub fn new(transformer: Arc<dyn Transformer>) -> Self {
        Self { transformer }
    }
}

impl StepHandler for TransformDataHandler {
    fn run<'a>(
        &'a self,
        config: Value,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, StepError>> {
        Box::pin(async move {
            let transform: TransformDataConfig = parse_config(StepKind::TransformData, config)?;
            let operation: TransformOperation = transform
                .operation
                .parse()
                .map_err(StepError::UnknownOperation)?;

            let input = transform
                .input
                .or_else(|| ctx.last_result().cloned())
                .or_else(|| ctx.trigger_data.clone())
                .unwrap_or(Value::Null);

            let result = self.transformer.apply(
                operation,
                &transform.expression,
                &input,
                transform.initial.as_ref(),
            )?;

            Ok(json!({
                "operation": operation.as_str(),
                "result": result,
            }))
        })
    }
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// Settings for the standard handler set.
#[derive(Debug, Clone)]
pub struct StepOptions {
    pub http_timeout: Duration,
    pub mail_from: String,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            mail_from: "autoflow@localhost".to_string(),
        }
    }
}

/// Single dispatch point for every step kind.
#[derive(Default)]
pub struct StepRunner {
    handlers: HashMap<StepKind, Arc<dyn StepHandler>>,
}

impl StepRunner {
    /// An empty runner; every step fails as unknown until handlers are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The runner with all three built-in handlers registered.
    pub fn standard(
        http: Arc<dyn HttpClient>,
        mail: Arc<dyn MailRelay>,
        transformer: Arc<dyn Transformer>,
        options: StepOptions,
    ) -> Self {
        Self::new()
            .with_handler(
                StepKind::HttpRequest,
                Arc::new(HttpRequestHandler::new(http, options.http_timeout)),
            )
            .with_handler(
                StepKind::SendEmail,
                Arc::new(SendEmailHandler::new(mail, options.mail_from)),
            )
            .with_handler(
                StepKind::TransformData,
                Arc::new(TransformDataHandler::new(transformer)),
            )
    }

    /// Register (or replace) the handler for a kind.
    pub fn with_handler(mut self, kind: StepKind, handler: Arc<dyn StepHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Run one step and return its result.
    pub async fn run(
        &self,
        step: &WorkflowStep,
        ctx: &ExecutionContext,
    ) -> Result<Value, StepError> {
        let handler = step
            .kind()
            .ok()
            .and_then(|kind| self.handlers.get(&kind))
            .ok_or_else(|| StepError::UnknownStepType(step.step_type.clone()))?;

        let config = resolve_config(&step.config, ctx);
        handler.run(config, ctx).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
