//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, except `/health`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflow CRUD
        .route(
            "/workflows",
            post(handlers::workflow::create_workflow).get(handlers::workflow::list_workflows),
        )
        .route(
            "/workflows/{id}",
            get(handlers::workflow::get_workflow)
                .put(handlers::workflow::update_workflow)
                .delete(handlers::workflow::delete_workflow),
        )
        // Lifecycle
        .route("/workflows/{id}/deploy", post(handlers::workflow::deploy_workflow))
        .route("/workflows/{id}/pause", post(handlers::workflow::pause_workflow))
        // Runs
        .route("/workflows/{id}/execute", post(handlers::workflow::execute_workflow))
        .route(
            "/workflows/{id}/executions",
            get(handlers::workflow::list_executions),
        )
        .route(
            "/workflows/{id}/webhook-url",
            get(handlers::workflow::get_webhook_url),
        )
        .route("/executions/{id}", get(handlers::execution::get_execution))
        // Triggers
        .route(
            "/webhooks/{webhook_id}",
            post(handlers::webhook::receive_webhook),
        )
        .route("/scheduler/jobs", get(handlers::scheduler::list_jobs));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness probe.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
