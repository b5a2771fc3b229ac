//! Workflow CRUD, lifecycle, and execution handlers for the REST API.
//!
//! Endpoints for managing workflow definitions, deploying and pausing them,
//! running them by hand, and reading their execution history.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use autoflow_types::workflow::{
    CreateWorkflowRequest, ExecutionRecord, UpdateWorkflowRequest, Workflow,
};

use crate::http::error::AppError;
use crate::http::extractors::query::ExecutionListQuery;
use crate::http::extractors::user::ActingUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /workflows/{id}/execute`. The whole body is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub test_data: Option<Value>,
}

fn workflow_links(resp: ApiResponse<Workflow>, id: &Uuid) -> ApiResponse<Workflow> {
    resp.with_link("self", &format!("/api/v1/workflows/{id}"))
        .with_link("executions", &format!("/api/v1/workflows/{id}/executions"))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows - Create a draft workflow.
pub async fn create_workflow(
    State(state): State<AppState>,
    user: ActingUser,
    Json(body): Json<CreateWorkflowRequest>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflow_service.create(user.id, body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let id = workflow.id;
    Ok(Json(workflow_links(
        ApiResponse::success(workflow, request_id, elapsed),
        &id,
    )))
}

/// GET /api/v1/workflows - List workflows, scoped to `X-User-Id` when given.
pub async fn list_workflows(
    State(state): State<AppState>,
    user: ActingUser,
) -> Result<Json<ApiResponse<Vec<Workflow>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let owner = user.explicit.then_some(user.id);
    let workflows = state.workflow_service.list(owner).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(workflows, request_id, elapsed).with_link("self", "/api/v1/workflows"),
    ))
}

/// GET /api/v1/workflows/{id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflow_service.get(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(workflow_links(
        ApiResponse::success(workflow, request_id, elapsed),
        &id,
    )))
}

/// PUT /api/v1/workflows/{id}
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWorkflowRequest>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflow_service.update(&id, body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(workflow_links(
        ApiResponse::success(workflow, request_id, elapsed),
        &id,
    )))
}

/// DELETE /api/v1/workflows/{id}
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.workflow_service.delete(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true, "id": id }),
        request_id,
        elapsed,
    )))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/{id}/deploy - Activate and schedule.
pub async fn deploy_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflow_service.deploy(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(workflow_links(
        ApiResponse::success(workflow, request_id, elapsed),
        &id,
    )))
}

/// POST /api/v1/workflows/{id}/pause - Pause and unschedule.
pub async fn pause_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Workflow>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let workflow = state.workflow_service.pause(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(workflow_links(
        ApiResponse::success(workflow, request_id, elapsed),
        &id,
    )))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/{id}/execute - Run now and return the record.
///
/// A failed run is still a successful request; the record carries the error.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApiResponse<ExecutionRecord>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request: ExecuteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExecuteRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid execute body: {e}")))?
    };

    let record = state
        .workflow_service
        .execute(&id, request.test_data)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let record_id = record.id;
    Ok(Json(
        ApiResponse::success(record, request_id, elapsed)
            .with_link("self", &format!("/api/v1/executions/{record_id}"))
            .with_link("workflow", &format!("/api/v1/workflows/{id}")),
    ))
}

/// GET /api/v1/workflows/{id}/executions?limit=
pub async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExecutionListQuery>,
) -> Result<Json<ApiResponse<Vec<ExecutionRecord>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let records = state
        .workflow_service
        .list_executions(&id, query.limit)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(records, request_id, elapsed)
            .with_link("workflow", &format!("/api/v1/workflows/{id}")),
    ))
}

/// GET /api/v1/workflows/{id}/webhook-url
pub async fn get_webhook_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let url = state.workflow_service.webhook_url(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "webhookUrl": url }),
        request_id,
        elapsed,
    )))
}
