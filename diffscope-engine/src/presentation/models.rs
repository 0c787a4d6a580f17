//! API DTOs with OpenAPI schemas
//!
//! Domain entities stay internal; these models are the wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use diffscope_core::domain::scan::{ScanReport, ScanRequest, ScanType};
use diffscope_core::domain::stage::StageFailure;

use crate::domain::value_objects::JobTransition;
use crate::infrastructure::job_store::JobSnapshot;

/// Body for `POST /api/v1/scans`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitScanRequest {
    pub scan_type: ScanType,
    /// Repository checkout location
    pub repository: String,
    /// Required for `pr` scans
    pub pr_id: Option<u64>,
    pub branch: Option<String>,
}

impl From<SubmitScanRequest> for ScanRequest {
    fn from(body: SubmitScanRequest) -> Self {
        Self {
            scan_type: body.scan_type,
            repository: body.repository,
            pr_id: body.pr_id,
            branch: body.branch,
        }
    }
}

/// Response for a submitted scan
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitScanResponse {
    pub job_id: Uuid,
}

/// Full job view returned by `GET /api/v1/jobs/{id}`
#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub scan_id: Uuid,
    pub scan_type: ScanType,
    pub repository: String,
    pub status: String,
    pub progress_percent: u8,
    pub current_stage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only when Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanReport>,
    /// Best-effort partial report; present only when Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_report: Option<ScanReport>,
    /// Which stage failed and why; present only when Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<StageFailure>,
    pub transitions: Vec<JobTransition>,
}

impl From<JobSnapshot> for JobStatusResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job_id: snapshot.job_id,
            scan_id: snapshot.scan_id,
            scan_type: snapshot.request.scan_type,
            repository: snapshot.request.repository,
            status: snapshot.status.to_string(),
            progress_percent: snapshot.progress_percent,
            current_stage: snapshot.current_stage.map(|s| s.to_string()),
            created_at: snapshot.created_at,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            result: snapshot.result,
            partial_report: snapshot.partial_report,
            error_detail: snapshot.error_detail,
            transitions: snapshot.transitions,
        }
    }
}

/// Compact job view returned by `GET /api/v1/jobs`
#[derive(Debug, Serialize, ToSchema)]
pub struct JobSummaryResponse {
    pub job_id: Uuid,
    pub scan_type: ScanType,
    pub repository: String,
    pub status: String,
    pub progress_percent: u8,
    pub current_stage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<JobSnapshot> for JobSummaryResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job_id: snapshot.job_id,
            scan_type: snapshot.request.scan_type,
            repository: snapshot.request.repository,
            status: snapshot.status.to_string(),
            progress_percent: snapshot.progress_percent,
            current_stage: snapshot.current_stage.map(|s| s.to_string()),
            created_at: snapshot.created_at,
            completed_at: snapshot.completed_at,
        }
    }
}

/// Query parameters for `GET /api/v1/jobs`
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListJobsQuery {
    /// Filter by status (pending, running, completed, failed, cancelled)
    pub status: Option<String>,
}

/// Error body returned by all endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health probe response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
