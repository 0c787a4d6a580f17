//! Engine domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use diffscope_core::domain::scan::{ScanReport, ScanRequest};
use diffscope_core::domain::stage::{StageFailure, StageName};

use super::value_objects::{JobStatus, JobTransition, JobTransitionError};

/// The externally visible unit of asynchronous work: one scan execution.
///
/// Owned by exactly one worker while in flight (single-writer); readers only
/// ever see snapshots taken after a completed transition. Mutations go
/// through [`ScanJob::transition`] so every status change is validated
/// against the state machine and recorded on the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub job_id: Uuid,
    pub scan_id: Uuid,
    pub request: ScanRequest,
    pub status: JobStatus,
    /// 0-100; non-decreasing while Running, 100 iff Completed
    pub progress_percent: u8,
    pub current_stage: Option<StageName>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Final report; present only when Completed
    pub result: Option<ScanReport>,
    /// Best-effort partial report from the error-handling stage; Failed only
    pub partial_report: Option<ScanReport>,
    /// The failure that ended the run; present only when Failed
    pub error_detail: Option<StageFailure>,
    /// Ordered history of state transitions (audit trail)
    pub transitions: Vec<JobTransition>,
}

impl ScanJob {
    pub fn new(request: ScanRequest) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            scan_id: Uuid::new_v4(),
            request,
            status: JobStatus::Pending,
            progress_percent: 0,
            current_stage: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            partial_report: None,
            error_detail: None,
            transitions: Vec::new(),
        }
    }

    /// Transition to `target`, validating against the state machine and
    /// recording an audit-trail entry.
    pub fn transition(
        &mut self,
        target: JobStatus,
        reason: Option<String>,
    ) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(&target) {
            return Err(JobTransitionError {
                from: self.status,
                to: target,
            });
        }

        let now = Utc::now();
        self.transitions.push(JobTransition {
            from: self.status,
            to: target,
            timestamp: now,
            reason,
        });

        if target == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if target.is_terminal() {
            self.completed_at = Some(now);
        }

        self.status = target;
        Ok(())
    }

    /// Record progress after a stage completed.
    ///
    /// `percent` is `None` for stages off the weighted path (the error
    /// handler); the previous percentage is kept. Progress never decreases.
    pub fn record_progress(&mut self, stage: StageName, percent: Option<u8>) {
        self.current_stage = Some(stage);
        if let Some(percent) = percent
            && percent > self.progress_percent
        {
            self.progress_percent = percent.min(100);
        }
    }
}
