//! Inbound webhook handler.
//!
//! `POST /api/v1/webhooks/{webhook_id}` resolves the single active workflow
//! listening on that id, starts it in the background with the request body
//! as trigger data, and acknowledges immediately.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use autoflow_core::workflow::trigger::WebhookAck;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Interpret a webhook body. Empty or non-JSON bodies carry no trigger data.
pub fn webhook_payload(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(body).ok()
}

/// POST /api/v1/webhooks/{webhook_id}
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAck>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let payload = webhook_payload(&body);
    let dispatched = state.dispatcher.dispatch(&webhook_id, payload).await?;

    let workflow_id = dispatched.ack.workflow_id;
    tokio::spawn(async move {
        match dispatched.run.await {
            Ok(Ok(record)) => tracing::info!(
                workflow_id = %workflow_id,
                execution_id = record.id,
                status = %record.status,
                "webhook-triggered execution finished"
            ),
            Ok(Err(e)) => tracing::error!(
                workflow_id = %workflow_id,
                error = %e,
                "webhook-triggered execution could not be recorded"
            ),
            Err(e) => tracing::error!(
                workflow_id = %workflow_id,
                error = %e,
                "webhook-triggered execution panicked"
            ),
        }
    });

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(dispatched.ack, request_id, elapsed)
            .with_link("executions", &format!("/api/v1/workflows/{workflow_id}/executions"))
            .with_link("workflow", &format!("/api/v1/workflows/{workflow_id}")),
    ))
}
