//! Scheduler inspection.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use autoflow_core::workflow::scheduler::ScheduledJob;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// One pending job as exposed over the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJobView {
    pub id: String,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub user_id: i64,
    pub run_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ScheduledJob> for PendingJobView {
    fn from(job: &ScheduledJob) -> Self {
        Self {
            id: job.key().id(),
            workflow_id: job.workflow_id,
            workflow_name: job.definition.name.clone(),
            user_id: job.user_id,
            run_at: job.run_at,
        }
    }
}

/// GET /api/v1/scheduler/jobs - Pending scheduled runs, soonest first.
pub async fn list_jobs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PendingJobView>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let jobs: Vec<PendingJobView> = state
        .scheduler
        .pending_jobs()
        .await
        .iter()
        .map(PendingJobView::from)
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(jobs, request_id, elapsed)))
}
