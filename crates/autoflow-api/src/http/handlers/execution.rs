//! Execution record lookup.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use autoflow_types::workflow::ExecutionRecord;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/executions/{id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ExecutionRecord>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let record = state.workflow_service.get_execution(id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let workflow_id = record.workflow_id;
    Ok(Json(
        ApiResponse::success(record, request_id, elapsed)
            .with_link("workflow", &format!("/api/v1/workflows/{workflow_id}")),
    ))
}
