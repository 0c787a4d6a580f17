//! Job lifecycle — centralised state-machine controller for scan jobs.
//!
//! Every status change goes through [`JobLifecycle`], which validates the
//! transition against the state machine defined on
//! [`crate::domain::JobStatus`], records the audit-trail entry, and persists
//! a fresh snapshot so readers always observe fully applied transitions.

use std::sync::Arc;

use tracing::{info, warn};

use diffscope_core::domain::scan::ScanReport;
use diffscope_core::domain::stage::{StageFailure, StageName};

use crate::domain::entities::ScanJob;
use crate::domain::value_objects::JobStatus;
use crate::infrastructure::job_store::{JobStore, JobStoreError};

/// Errors from the lifecycle layer.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid state transition: {0}")]
    InvalidTransition(#[from] crate::domain::value_objects::JobTransitionError),

    #[error("Persistence error: {0}")]
    Store(#[from] JobStoreError),
}

/// Centralised job lifecycle controller.
///
/// Workers call `JobLifecycle` instead of mutating [`ScanJob`] status fields
/// directly, so every change is validated, persisted, and logged in one
/// place.
#[derive(Clone)]
pub struct JobLifecycle {
    job_store: Arc<dyn JobStore>,
}

impl JobLifecycle {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self { job_store }
    }

    /// Transition a job to [`JobStatus::Running`] and persist.
    pub async fn start(&self, job: &mut ScanJob) -> Result<(), LifecycleError> {
        job.transition(JobStatus::Running, Some("Worker started execution".into()))?;
        self.persist(job).await?;

        info!(job_id = %job.job_id, "Job transitioned to Running");
        Ok(())
    }

    /// Transition a job to [`JobStatus::Completed`] with its report and persist.
    pub async fn complete(
        &self,
        job: &mut ScanJob,
        report: ScanReport,
    ) -> Result<(), LifecycleError> {
        job.transition(
            JobStatus::Completed,
            Some(format!(
                "Completed with {} findings",
                report.summary.total_findings
            )),
        )?;
        job.progress_percent = 100;
        job.result = Some(report);
        self.persist(job).await?;

        info!(job_id = %job.job_id, "Job transitioned to Completed");
        Ok(())
    }

    /// Transition a job to [`JobStatus::Failed`] with error detail and the
    /// sink stage's best-effort partial report, then persist.
    pub async fn fail(
        &self,
        job: &mut ScanJob,
        failure: StageFailure,
        partial_report: Option<ScanReport>,
    ) -> Result<(), LifecycleError> {
        job.transition(
            JobStatus::Failed,
            Some(format!("Stage {} failed: {}", failure.stage, failure.message)),
        )?;
        job.error_detail = Some(failure.clone());
        job.partial_report = partial_report;
        self.persist(job).await?;

        warn!(job_id = %job.job_id, stage = %failure.stage, "Job transitioned to Failed");
        Ok(())
    }

    /// Transition a job to [`JobStatus::Cancelled`] and persist.
    pub async fn cancel(&self, job: &mut ScanJob, reason: &str) -> Result<(), LifecycleError> {
        job.transition(JobStatus::Cancelled, Some(format!("Cancelled: {}", reason)))?;
        self.persist(job).await?;

        info!(job_id = %job.job_id, reason, "Job transitioned to Cancelled");
        Ok(())
    }

    /// Record stage completion progress and persist.
    ///
    /// Persistence failures here are logged but not surfaced: losing one
    /// progress update must not abort a healthy run.
    pub async fn progress(&self, job: &mut ScanJob, stage: StageName, percent: Option<u8>) {
        job.record_progress(stage, percent);

        if let Err(e) = self.persist(job).await {
            warn!(job_id = %job.job_id, stage = %stage, error = %e, "Failed to persist progress update");
        }
    }

    async fn persist(&self, job: &ScanJob) -> Result<(), JobStoreError> {
        self.job_store.save_snapshot(job.into()).await
    }
}
