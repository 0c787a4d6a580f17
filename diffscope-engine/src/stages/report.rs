//! Reporting stage: assemble the final scan report

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use diffscope_core::domain::scan::{ReportSummary, ScanReport, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

pub struct ReportingStage;

#[async_trait]
impl Stage for ReportingStage {
    fn name(&self) -> StageName {
        StageName::Reporting
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let report = ScanReport {
            scan_id: state.scan_id,
            scan_type: state.scan_type,
            repository: state.repository.clone(),
            summary: ReportSummary::from_findings(&state.static_findings),
            findings: state.static_findings.clone(),
            impact: state.impact.clone(),
            project: state.project_summary.clone(),
            llm_review: state.llm_review.clone(),
            partial: false,
            error: None,
            generated_at: Utc::now(),
        };

        debug!(
            scan_id = %state.scan_id,
            findings = report.summary.total_findings,
            "Report assembled"
        );

        state.report = Some(report);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffscope_core::domain::scan::{
        Confidence, Finding, FindingCategory, Location, ScanRequest, ScanType, Severity,
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_report_summarizes_findings() {
        let mut state = ScanState::new(
            Uuid::new_v4(),
            &ScanRequest {
                scan_type: ScanType::Project,
                repository: "/tmp/checkout".to_string(),
                pr_id: None,
                branch: None,
            },
        );
        state.static_findings = vec![
            Finding {
                id: "A:1".into(),
                rule_id: "A".into(),
                category: FindingCategory::Security,
                severity: Severity::Critical,
                confidence: Confidence::High,
                location: Location {
                    path: "a.rs".into(),
                    line: Some(1),
                },
                description: "critical".into(),
                enrichment: None,
            },
            Finding {
                id: "B:1".into(),
                rule_id: "B".into(),
                category: FindingCategory::Maintainability,
                severity: Severity::Info,
                confidence: Confidence::Medium,
                location: Location {
                    path: "b.rs".into(),
                    line: Some(2),
                },
                description: "info".into(),
                enrichment: None,
            },
        ];

        let ctx = StageContext::new(CancellationToken::new(), Duration::from_secs(5));
        let result = ReportingStage.execute(state, &ctx).await.unwrap();
        let report = result.report.unwrap();

        assert!(!report.partial);
        assert!(report.error.is_none());
        assert_eq!(report.summary.total_findings, 2);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.summary.info, 1);
    }
}
