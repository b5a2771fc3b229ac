//! Workflow domain types for autoflow.
//!
//! `WorkflowDefinition` is the blueprint a run executes: a trigger plus an
//! ordered list of steps. `Workflow` is the stored record wrapping a definition
//! with ownership and lifecycle status. `ExecutionRecord` and `StepLogEntry`
//! are the persisted trace of a single run.
//!
//! Definition and execution JSON uses camelCase field names so that stored
//! records can be consumed verbatim by downstream viewers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// The blueprint of a workflow: one trigger and an ordered step sequence.
///
/// Immutable for the duration of a run. The engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Matches the owning `Workflow.id`.
    pub id: Uuid,
    pub name: String,
    pub trigger: Trigger,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Look up a step by its ID.
    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// How a workflow is started. Exactly one variant per workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire on a cron schedule (five or six fields).
    Schedule { cron: String },
    /// Fire when `POST /webhooks/{webhookId}` is called.
    Webhook {
        #[serde(rename = "webhookId")]
        webhook_id: String,
    },
    /// Fire only on explicit request.
    Manual,
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Schedule { .. } => TriggerKind::Schedule,
            Trigger::Webhook { .. } => TriggerKind::Webhook,
            Trigger::Manual => TriggerKind::Manual,
        }
    }

    /// The cron expression, if this is a schedule trigger.
    pub fn cron(&self) -> Option<&str> {
        match self {
            Trigger::Schedule { cron } => Some(cron.as_str()),
            _ => None,
        }
    }

    /// The webhook identifier, if this is a webhook trigger.
    pub fn webhook_id(&self) -> Option<&str> {
        match self {
            Trigger::Webhook { webhook_id } => Some(webhook_id.as_str()),
            _ => None,
        }
    }
}

/// Discriminant of [`Trigger`], used for store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Schedule,
    Webhook,
    Manual,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Schedule => "schedule",
            TriggerKind::Webhook => "webhook",
            TriggerKind::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(TriggerKind::Schedule),
            "webhook" => Ok(TriggerKind::Webhook),
            "manual" => Ok(TriggerKind::Manual),
            other => Err(format!("unknown trigger type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// A single step of a workflow.
///
/// `step_type` keeps the raw `type` string from the definition so that an
/// unrecognized kind survives deserialization and fails at dispatch time
/// rather than making the whole definition unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within the workflow; key into the step results of a run.
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    /// Arbitrary config; string leaves may contain `{{...}}` placeholders.
    #[serde(default = "empty_config")]
    pub config: serde_json::Value,
}

fn empty_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl WorkflowStep {
    /// Parse the step type into the closed set of supported kinds.
    pub fn kind(&self) -> Result<StepKind, String> {
        self.step_type.parse()
    }
}

/// The closed set of step kinds the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    HttpRequest,
    SendEmail,
    TransformData,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [
        StepKind::HttpRequest,
        StepKind::SendEmail,
        StepKind::TransformData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::HttpRequest => "http_request",
            StepKind::SendEmail => "send_email",
            StepKind::TransformData => "transform_data",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Resolved configuration of an `http_request` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    #[serde(default = "default_http_method")]
    pub method: String,
    pub url: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_text::header_map"
    )]
    pub headers: Option<HashMap<String, String>>,
    /// Sent as JSON unless it is a plain string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// Resolved configuration of a `send_email` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailConfig {
    #[serde(deserialize_with = "scalar_text::required")]
    pub to: String,
    #[serde(deserialize_with = "scalar_text::required")]
    pub subject: String,
    #[serde(deserialize_with = "scalar_text::required")]
    pub body: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_text::optional"
    )]
    pub cc: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_text::optional"
    )]
    pub bcc: Option<String>,
}

/// Text fields of step configs that also accept numbers and booleans.
///
/// A whole-string placeholder keeps the JSON type of what it resolves to, so
/// `"{{step_s1.data.orderId}}"` may arrive here as `1042`.
mod scalar_text {
    use std::collections::HashMap;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_text<E: Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Err(E::custom("expected text, found null")),
            Value::Array(_) => Err(E::custom("expected text, found an array")),
            Value::Object(_) => Err(E::custom("expected text, found an object")),
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        to_text(Value::deserialize(deserializer)?)
    }

    pub fn optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => to_text(value).map(Some),
        }
    }

    pub fn header_map<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<HashMap<String, String>>, D::Error> {
        let Some(raw) = Option::<HashMap<String, Value>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        raw.into_iter()
            .map(|(name, value)| {
                to_text(value)
                    .map(|text| (name.clone(), text))
                    .map_err(|e: D::Error| D::Error::custom(format!("header {name}: {e}")))
            })
            .collect::<Result<_, _>>()
            .map(Some)
    }
}

/// Resolved configuration of a `transform_data` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformDataConfig {
    /// One of `filter`, `map`, `reduce`. Kept raw so unknown values can be
    /// reported with their original spelling.
    pub operation: String,
    pub expression: String,
    /// Explicit input; defaults to the most recent step result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Initial accumulator for `reduce`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<serde_json::Value>,
}

/// The data transform operations a `transform_data` step supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOperation {
    Filter,
    Map,
    Reduce,
}

impl TransformOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformOperation::Filter => "filter",
            TransformOperation::Map => "map",
            TransformOperation::Reduce => "reduce",
        }
    }
}

impl FromStr for TransformOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(TransformOperation::Filter),
            "map" => Ok(TransformOperation::Map),
            "reduce" => Ok(TransformOperation::Reduce),
            other => Err(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stored Workflow
// ---------------------------------------------------------------------------

/// Lifecycle status of a stored workflow. Only `Active` workflows fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(WorkflowStatus::Draft),
            "active" => Ok(WorkflowStatus::Active),
            "paused" => Ok(WorkflowStatus::Paused),
            other => Err(format!("invalid workflow status: '{other}'")),
        }
    }
}

/// A workflow as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// UUIDv7; always equal to `definition.id`.
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "workflowJson")]
    pub definition: WorkflowDefinition,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }
}

/// A definition as submitted by a client, before an ID is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Defaults to the workflow name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub trigger: Trigger,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDocument {
    /// Bind the document to a workflow ID and name.
    pub fn into_definition(self, id: Uuid, fallback_name: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            id,
            name: self.name.unwrap_or_else(|| fallback_name.to_string()),
            trigger: self.trigger,
            steps: self.steps,
        }
    }
}

impl From<WorkflowDefinition> for WorkflowDocument {
    fn from(def: WorkflowDefinition) -> Self {
        Self {
            name: Some(def.name),
            trigger: def.trigger,
            steps: def.steps,
        }
    }
}

/// Request to create a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub workflow: WorkflowDocument,
}

/// Request to update a workflow. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWorkflowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workflow: Option<WorkflowDocument>,
}

// ---------------------------------------------------------------------------
// Execution Records
// ---------------------------------------------------------------------------

/// Status of a whole run. Terminal once it leaves `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("invalid execution status: '{other}'")),
        }
    }
}

/// Status of a single step attempt inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// One entry of a run's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLogEntry {
    pub step_id: String,
    pub step_type: String,
    pub started_at: DateTime<Utc>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepLogEntry {
    /// Open a `running` entry for a step that is about to execute.
    pub fn start(step: &WorkflowStep) -> Self {
        Self {
            step_id: step.id.clone(),
            step_type: step.step_type.clone(),
            started_at: Utc::now(),
            status: StepStatus::Running,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn complete(mut self, result: serde_json::Value) -> Self {
        self.status = StepStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = StepStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        self
    }
}

/// The persisted record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Assigned by the store on creation.
    pub id: i64,
    pub workflow_id: Uuid,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub execution_log: Vec<StepLogEntry>,
    /// Snapshot of the payload that started the run (`{}` when none).
    pub trigger_data: serde_json::Value,
}

/// Input for creating a `running` execution record.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub workflow_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub trigger_data: serde_json::Value,
}

/// Terminal update applied to an execution record exactly once.
#[derive(Debug, Clone)]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    pub completed_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub execution_log: Vec<StepLogEntry>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_email_config_accepts_scalar_text() {
        let cfg: SendEmailConfig = serde_json::from_value(json!({
            "to": "ops@example.com",
            "subject": 1042,
            "body": true,
            "cc": null,
        }))
        .unwrap();
        assert_eq!(cfg.subject, "1042");
        assert_eq!(cfg.body, "true");
        assert!(cfg.cc.is_none());

        let err = serde_json::from_value::<SendEmailConfig>(json!({
            "to": ["a@b.com"],
            "subject": "s",
            "body": "b",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("expected text, found an array"));
    }

    #[test]
    fn test_http_headers_accept_scalar_values() {
        let cfg: HttpRequestConfig = serde_json::from_value(json!({
            "url": "https://example.com",
            "headers": {"X-Id": 77, "X-Retry": false, "Accept": "application/json"},
        }))
        .unwrap();
        let headers = cfg.headers.unwrap();
        assert_eq!(headers["X-Id"], "77");
        assert_eq!(headers["X-Retry"], "false");
        assert_eq!(headers["Accept"], "application/json");

        let err = serde_json::from_value::<HttpRequestConfig>(json!({
            "url": "https://example.com",
            "headers": {"X-Bad": {"nested": 1}},
        }))
        .unwrap_err();
        assert!(err.to_string().contains("header X-Bad"));
    }

    #[test]
    fn test_parse_definition_json() {
        let raw = json!({
            "id": "01938e90-0000-7000-8000-000000000001",
            "name": "lead-followup",
            "trigger": { "type": "webhook", "webhookId": "hook-42" },
            "steps": [
                { "id": "s1", "type": "http_request", "config": { "method": "GET", "url": "https://example.com/x" } },
                { "id": "s2", "type": "send_email", "config": { "to": "{{step_s1.data.email}}", "subject": "hi", "body": "ok" } }
            ]
        });
        let def: WorkflowDefinition = serde_json::from_value(raw).unwrap();
        assert_eq!(def.name, "lead-followup");
        assert_eq!(def.trigger.webhook_id(), Some("hook-42"));
        assert_eq!(def.steps.len(), 2);
        assert_eq!(def.steps[1].kind(), Ok(StepKind::SendEmail));
        assert!(def.step("s2").is_some());
    }

    #[test]
    fn test_trigger_tagging() {
        let schedule = Trigger::Schedule {
            cron: "*/5 * * * *".to_string(),
        };
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json, json!({ "type": "schedule", "cron": "*/5 * * * *" }));

        let manual: Trigger = serde_json::from_value(json!({ "type": "manual" })).unwrap();
        assert_eq!(manual, Trigger::Manual);
        assert_eq!(manual.kind(), TriggerKind::Manual);
        assert!(manual.cron().is_none());
    }

    #[test]
    fn test_unknown_step_type_survives_deserialization() {
        let step: WorkflowStep =
            serde_json::from_value(json!({ "id": "x", "type": "launch_rocket" })).unwrap();
        assert_eq!(step.kind(), Err("launch_rocket".to_string()));
        assert!(step.config.is_object());
    }

    #[test]
    fn test_step_kind_strings() {
        for kind in StepKind::ALL {
            assert_eq!(kind.as_str().parse::<StepKind>(), Ok(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_transform_operation_parse() {
        assert_eq!("reduce".parse(), Ok(TransformOperation::Reduce));
        assert_eq!(
            "explode".parse::<TransformOperation>(),
            Err("explode".to_string())
        );
    }

    #[test]
    fn test_http_config_defaults_to_get() {
        let cfg: HttpRequestConfig =
            serde_json::from_value(json!({ "url": "https://example.com" })).unwrap();
        assert_eq!(cfg.method, "GET");
        assert!(cfg.headers.is_none());
        assert!(cfg.body.is_none());
    }

    #[test]
    fn test_step_log_entry_lifecycle_and_shape() {
        let step = WorkflowStep {
            id: "s1".to_string(),
            step_type: "http_request".to_string(),
            config: json!({}),
        };
        let entry = StepLogEntry::start(&step);
        assert_eq!(entry.status, StepStatus::Running);
        assert!(entry.completed_at.is_none());

        let done = entry.clone().complete(json!({ "status": 200 }));
        assert_eq!(done.status, StepStatus::Completed);
        assert!(done.completed_at.is_some());

        let failed = entry.fail("boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["stepId"], "s1");
        assert_eq!(json["stepType"], "http_request");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_execution_record_camel_case() {
        let record = ExecutionRecord {
            id: 7,
            workflow_id: Uuid::now_v7(),
            status: ExecutionStatus::Failed,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: Some("step s1 failed".to_string()),
            execution_log: vec![],
            trigger_data: json!({}),
        };
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "workflowId",
            "startedAt",
            "completedAt",
            "errorMessage",
            "executionLog",
            "triggerData",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }

    #[test]
    fn test_create_request_binds_definition() {
        let req: CreateWorkflowRequest = serde_json::from_value(json!({
            "name": "nightly",
            "workflow": {
                "trigger": { "type": "schedule", "cron": "0 2 * * *" },
                "steps": [{ "id": "s1", "type": "http_request", "config": { "url": "https://x" } }]
            }
        }))
        .unwrap();
        assert!(req.description.is_none());

        let id = Uuid::now_v7();
        let def = req.workflow.into_definition(id, &req.name);
        assert_eq!(def.id, id);
        assert_eq!(def.name, "nightly");
        assert_eq!(def.trigger.cron(), Some("0 2 * * *"));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            WorkflowStatus::Draft,
            WorkflowStatus::Active,
            WorkflowStatus::Paused,
        ] {
            assert_eq!(status.as_str().parse::<WorkflowStatus>(), Ok(status));
        }
        assert!("archived".parse::<WorkflowStatus>().is_err());
        assert_eq!("failed".parse(), Ok(ExecutionStatus::Failed));
    }
}
