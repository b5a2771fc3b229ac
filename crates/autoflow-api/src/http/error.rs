//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use autoflow_core::workflow::trigger::TriggerError;
use autoflow_types::error::{RepositoryError, WorkflowError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow lifecycle errors.
    Workflow(WorkflowError),
    /// Webhook resolution errors.
    Trigger(TriggerError),
    /// Malformed request input.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl From<TriggerError> for AppError {
    fn from(e: TriggerError) -> Self {
        AppError::Trigger(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Workflow(WorkflowError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "WORKFLOW_NOT_FOUND", self.message())
            }
            AppError::Workflow(WorkflowError::ExecutionNotFound(_)) => {
                (StatusCode::NOT_FOUND, "EXECUTION_NOT_FOUND", self.message())
            }
            AppError::Workflow(WorkflowError::Validation(_))
            | AppError::Workflow(WorkflowError::NotWebhookTriggered(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.message())
            }
            AppError::Workflow(WorkflowError::Repository(RepositoryError::Conflict(_))) => {
                (StatusCode::CONFLICT, "CONFLICT", self.message())
            }
            AppError::Workflow(WorkflowError::Repository(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", self.message())
            }
            AppError::Trigger(TriggerError::WebhookNotFound(_)) => {
                (StatusCode::NOT_FOUND, "WEBHOOK_NOT_FOUND", self.message())
            }
            AppError::Trigger(TriggerError::AmbiguousWebhook { .. }) => {
                (StatusCode::CONFLICT, "AMBIGUOUS_WEBHOOK", self.message())
            }
            AppError::Trigger(TriggerError::Repository(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", self.message())
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.message()),
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.message())
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Workflow(e) => e.to_string(),
            AppError::Trigger(e) => e.to_string(),
            AppError::Validation(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        (
            status,
            Json(ApiResponse::error(code, &message, String::new(), 0)),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(WorkflowError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (AppError::from(WorkflowError::ExecutionNotFound(4)), StatusCode::NOT_FOUND),
            (AppError::from(WorkflowError::Validation("bad".into())), StatusCode::BAD_REQUEST),
            (
                AppError::from(WorkflowError::NotWebhookTriggered("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(WorkflowError::Repository(RepositoryError::Connection)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(TriggerError::WebhookNotFound("h".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(TriggerError::AmbiguousWebhook {
                    webhook_id: "h".into(),
                    count: 2,
                }),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.parts().0, expected, "{err:?}");
        }
    }

    #[test]
    fn test_error_envelope_body() {
        let response = AppError::Validation("limit must be positive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
