//! Error-handling stage: the universal failure sink
//!
//! Reached when any pipeline stage fails. Assembles a best-effort partial
//! report from whatever the run managed to produce, plus the normalized
//! failure record. This stage must never fail; everything it touches is
//! already in memory.

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use diffscope_core::domain::scan::{ReportSummary, ScanReport, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

pub struct ErrorHandlerStage;

#[async_trait]
impl Stage for ErrorHandlerStage {
    fn name(&self) -> StageName {
        StageName::ErrorHandler
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let failure = state.error.clone();

        match &failure {
            Some(failure) => warn!(
                scan_id = %state.scan_id,
                stage = %failure.stage,
                kind = ?failure.kind,
                "Assembling partial report after stage failure"
            ),
            None => warn!(
                scan_id = %state.scan_id,
                "Error handler reached without a recorded failure"
            ),
        }

        state.report = Some(ScanReport {
            scan_id: state.scan_id,
            scan_type: state.scan_type,
            repository: state.repository.clone(),
            summary: ReportSummary::from_findings(&state.static_findings),
            findings: state.static_findings.clone(),
            impact: state.impact.clone(),
            project: state.project_summary.clone(),
            llm_review: state.llm_review.clone(),
            partial: true,
            error: failure,
            generated_at: Utc::now(),
        });

        Ok(state)
    }
}
