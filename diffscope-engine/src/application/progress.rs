//! Stage completion → progress percentage mapping
//!
//! Each scan type has its own ordered weight table because the two paths
//! traverse different stage sets. Weights sum to 100; the percentage reported
//! after a stage is the cumulative weight up to and including it, so values
//! are non-decreasing over a run and reach 100 exactly when the reporting
//! stage completes.

use diffscope_core::domain::scan::ScanType;
use diffscope_core::domain::stage::StageName;

/// Configuration defect in a progress weight table, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ProgressConfigError {
    #[error("Progress weights for {scan_type} scans sum to {total}, expected 100")]
    BadTotal { scan_type: ScanType, total: u32 },

    #[error("Progress table for {scan_type} scans must end with the reporting stage")]
    BadTerminalStage { scan_type: ScanType },

    #[error("Duplicate progress entry for stage {0}")]
    DuplicateStage(StageName),
}

/// Maps completed stages to a cumulative percentage per scan type
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    pr: Vec<(StageName, u8)>,
    project: Vec<(StageName, u8)>,
}

impl ProgressTracker {
    /// Weight tables for the standard pipeline.
    pub fn standard() -> Self {
        Self {
            pr: vec![
                (StageName::Fetch, 15),
                (StageName::Parse, 15),
                (StageName::StaticAnalysis, 20),
                (StageName::ImpactAnalysis, 20),
                (StageName::LlmAnalysis, 15),
                (StageName::Reporting, 15),
            ],
            project: vec![
                (StageName::Fetch, 15),
                (StageName::Parse, 15),
                (StageName::StaticAnalysis, 20),
                (StageName::ProjectScan, 20),
                (StageName::LlmAnalysis, 15),
                (StageName::Reporting, 15),
            ],
        }
    }

    fn table(&self, scan_type: ScanType) -> &[(StageName, u8)] {
        match scan_type {
            ScanType::Pr => &self.pr,
            ScanType::Project => &self.project,
        }
    }

    /// Cumulative percentage after `stage` completed on the `scan_type` path.
    ///
    /// Returns `None` for stages off the weighted path (the error handler),
    /// in which case the job keeps its previous percentage.
    pub fn percent_after(&self, scan_type: ScanType, stage: StageName) -> Option<u8> {
        let table = self.table(scan_type);
        let position = table.iter().position(|(name, _)| *name == stage)?;

        let cumulative: u32 = table[..=position]
            .iter()
            .map(|(_, weight)| u32::from(*weight))
            .sum();

        Some(cumulative.min(100) as u8)
    }

    /// Startup validation: each table is duplicate-free, sums to 100, and
    /// terminates at the reporting stage.
    pub fn validate(&self) -> Result<(), ProgressConfigError> {
        for scan_type in [ScanType::Pr, ScanType::Project] {
            let table = self.table(scan_type);

            for (i, (stage, _)) in table.iter().enumerate() {
                if table[..i].iter().any(|(other, _)| other == stage) {
                    return Err(ProgressConfigError::DuplicateStage(*stage));
                }
            }

            let total: u32 = table.iter().map(|(_, weight)| u32::from(*weight)).sum();
            if total != 100 {
                return Err(ProgressConfigError::BadTotal { scan_type, total });
            }

            if table.last().map(|(stage, _)| *stage) != Some(StageName::Reporting) {
                return Err(ProgressConfigError::BadTerminalStage { scan_type });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables_validate() {
        ProgressTracker::standard()
            .validate()
            .expect("standard weights must validate");
    }

    #[test]
    fn test_percentages_are_monotone_and_reach_100() {
        let tracker = ProgressTracker::standard();
        let path = [
            StageName::Fetch,
            StageName::Parse,
            StageName::StaticAnalysis,
            StageName::ImpactAnalysis,
            StageName::LlmAnalysis,
            StageName::Reporting,
        ];

        let mut previous = 0;
        for stage in path {
            let percent = tracker
                .percent_after(ScanType::Pr, stage)
                .expect("stage is on the pr path");
            assert!(percent > previous, "{stage} must advance progress");
            previous = percent;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    fn test_100_only_after_reporting() {
        let tracker = ProgressTracker::standard();
        for scan_type in [ScanType::Pr, ScanType::Project] {
            let table_stages: Vec<StageName> = match scan_type {
                ScanType::Pr => vec![
                    StageName::Fetch,
                    StageName::Parse,
                    StageName::StaticAnalysis,
                    StageName::ImpactAnalysis,
                    StageName::LlmAnalysis,
                ],
                ScanType::Project => vec![
                    StageName::Fetch,
                    StageName::Parse,
                    StageName::StaticAnalysis,
                    StageName::ProjectScan,
                    StageName::LlmAnalysis,
                ],
            };

            for stage in table_stages {
                let percent = tracker.percent_after(scan_type, stage).unwrap();
                assert!(percent < 100, "{stage} must not report completion");
            }
            assert_eq!(
                tracker.percent_after(scan_type, StageName::Reporting),
                Some(100)
            );
        }
    }

    #[test]
    fn test_off_path_stages_have_no_percentage() {
        let tracker = ProgressTracker::standard();
        assert_eq!(
            tracker.percent_after(ScanType::Pr, StageName::ErrorHandler),
            None
        );
        assert_eq!(
            tracker.percent_after(ScanType::Pr, StageName::ProjectScan),
            None
        );
        assert_eq!(
            tracker.percent_after(ScanType::Project, StageName::ImpactAnalysis),
            None
        );
    }
}
