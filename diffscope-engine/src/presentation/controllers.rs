//! Request handlers for the scan API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::error;
use uuid::Uuid;

use crate::domain::value_objects::JobStatus;
use crate::infrastructure::job_service::{JobService, JobServiceError};
use crate::presentation::models::{
    ErrorResponse, HealthResponse, JobStatusResponse, JobSummaryResponse, ListJobsQuery,
    SubmitScanRequest, SubmitScanResponse,
};

/// Shared handler state
#[derive(Clone)]
pub struct EngineState {
    pub job_service: Arc<JobService>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn map_service_error(err: JobServiceError) -> ApiError {
    match &err {
        JobServiceError::InvalidRequest(_) => api_error(StatusCode::BAD_REQUEST, err.to_string()),
        JobServiceError::NotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
        JobServiceError::AlreadyTerminal { .. } => api_error(StatusCode::CONFLICT, err.to_string()),
        JobServiceError::QueueClosed => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        JobServiceError::Store(_) | JobServiceError::Lifecycle(_) => {
            error!(error = %err, "Job service internal error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// POST /api/v1/scans - Submit a scan
#[utoipa::path(
    post,
    path = "/api/v1/scans",
    request_body = SubmitScanRequest,
    responses(
        (status = 202, description = "Scan accepted", body = SubmitScanResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 503, description = "Queue unavailable", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn submit_scan(
    State(state): State<EngineState>,
    Json(body): Json<SubmitScanRequest>,
) -> Result<(StatusCode, Json<SubmitScanResponse>), ApiError> {
    let job_id = state
        .job_service
        .submit(body.into())
        .await
        .map_err(map_service_error)?;

    Ok((StatusCode::ACCEPTED, Json(SubmitScanResponse { job_id })))
}

/// GET /api/v1/jobs/{id} - Retrieve job by ID
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = JobStatusResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<EngineState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let snapshot = state
        .job_service
        .status(id)
        .await
        .map_err(map_service_error)?;

    Ok(Json(snapshot.into()))
}

/// POST /api/v1/jobs/{id}/cancel - Request cancellation
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 409, description = "Job already terminal", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn cancel_job(
    State(state): State<EngineState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .job_service
        .cancel(id)
        .await
        .map_err(map_service_error)?;

    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/jobs - List jobs for operator visibility
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Jobs listed", body = [JobSummaryResponse]),
        (status = 400, description = "Invalid status filter", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<EngineState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobSummaryResponse>>, ApiError> {
    let filter = match query.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<JobStatus>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        None => None,
    };

    let snapshots = state
        .job_service
        .list(filter)
        .await
        .map_err(map_service_error)?;

    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
