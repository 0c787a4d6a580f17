//! Project scan stage (project path)
//!
//! Aggregates the parsed-source index into whole-repository statistics.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use diffscope_core::domain::scan::{LanguageStats, ProjectSummary, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

pub struct ProjectScanStage;

#[async_trait]
impl Stage for ProjectScanStage {
    fn name(&self) -> StageName {
        StageName::ProjectScan
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let checkout = state.checkout.as_ref().ok_or_else(|| {
            StageError::InvalidInput("project scan requires a fetched checkout".into())
        })?;
        let parsed = state.parsed.as_ref().ok_or_else(|| {
            StageError::InvalidInput("project scan requires parsed source facts".into())
        })?;

        let mut by_language: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut total_lines = 0;

        for file in &parsed.files {
            total_lines += file.lines;
            if let Some(language) = &file.language {
                let entry = by_language.entry(language.clone()).or_default();
                entry.0 += 1;
                entry.1 += file.lines;
            }
        }

        let mut by_language: Vec<LanguageStats> = by_language
            .into_iter()
            .map(|(language, (files, lines))| LanguageStats {
                language,
                files,
                lines,
            })
            .collect();
        by_language.sort_by(|a, b| b.lines.cmp(&a.lines));

        debug!(
            scan_id = %state.scan_id,
            total_files = checkout.files.len(),
            total_lines,
            "Project scan finished"
        );

        state.project_summary = Some(ProjectSummary {
            total_files: checkout.files.len(),
            total_lines,
            by_language,
        });

        Ok(state)
    }
}
