use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use diffscope_core::domain::scan::{ScanReport, ScanRequest};
use diffscope_core::domain::stage::{StageFailure, StageName};

use crate::domain::entities::ScanJob;
use crate::domain::value_objects::{JobStatus, JobTransition};

/// Point-in-time copy of a job's externally visible state.
///
/// Snapshots are what `status`/`list` hand to callers: they are taken only
/// after a transition has fully applied, so readers never observe a torn
/// update, and they are owned copies, so no caller can reach the live job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub scan_id: Uuid,
    pub request: ScanRequest,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub current_stage: Option<StageName>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Final report; present only when Completed
    pub result: Option<ScanReport>,
    /// Best-effort partial report from the error-handling stage; Failed only
    pub partial_report: Option<ScanReport>,
    /// Which stage failed and why; present only when Failed
    pub error_detail: Option<StageFailure>,
    /// Ordered history of state transitions (audit trail)
    pub transitions: Vec<JobTransition>,
}

impl JobSnapshot {
    /// Rebuild the job entity from its snapshot.
    ///
    /// Used by the cancel path to finalize a Pending job whose entity is
    /// still travelling through the queue; the snapshot carries the complete
    /// externally visible state.
    pub fn into_job(self) -> ScanJob {
        ScanJob {
            job_id: self.job_id,
            scan_id: self.scan_id,
            request: self.request,
            status: self.status,
            progress_percent: self.progress_percent,
            current_stage: self.current_stage,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            result: self.result,
            partial_report: self.partial_report,
            error_detail: self.error_detail,
            transitions: self.transitions,
        }
    }
}

impl From<&ScanJob> for JobSnapshot {
    fn from(job: &ScanJob) -> Self {
        Self {
            job_id: job.job_id,
            scan_id: job.scan_id,
            request: job.request.clone(),
            status: job.status,
            progress_percent: job.progress_percent,
            current_stage: job.current_stage,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            result: job.result.clone(),
            partial_report: job.partial_report.clone(),
            error_detail: job.error_detail.clone(),
            transitions: job.transitions.clone(),
        }
    }
}
