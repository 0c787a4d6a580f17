//! Route definitions and router setup

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use diffscope_core::config::ServerConfig;

use crate::presentation::controllers::{
    EngineState, cancel_job, get_job, health_check, list_jobs, submit_scan,
};
use crate::presentation::models::*;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::submit_scan,
        crate::presentation::controllers::get_job,
        crate::presentation::controllers::cancel_job,
        crate::presentation::controllers::list_jobs,
        crate::presentation::controllers::health_check,
    ),
    components(schemas(
        SubmitScanRequest,
        SubmitScanResponse,
        JobStatusResponse,
        JobSummaryResponse,
        ErrorResponse,
        HealthResponse,
    )),
    tags(
        (name = "scans", description = "Scan submission"),
        (name = "jobs", description = "Job status, listing, and cancellation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn create_router(state: EngineState, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/scans", post(submit_scan))
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/{id}", get(get_job))
        .route("/api/v1/jobs/{id}/cancel", post(cancel_job))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )))
        .with_state(state);

    if server.enable_docs {
        router = router
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}
