//! Impact analysis stage (PR path)
//!
//! Correlates static findings against the PR's changed-file set: which
//! findings live in changed code, and which changed files are hotspots.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::debug;

use diffscope_core::domain::scan::{ImpactAnalysis, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

const MAX_HOTSPOTS: usize = 5;

pub struct ImpactAnalysisStage;

#[async_trait]
impl Stage for ImpactAnalysisStage {
    fn name(&self) -> StageName {
        StageName::ImpactAnalysis
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let checkout = state.checkout.as_ref().ok_or_else(|| {
            StageError::InvalidInput("impact analysis requires a fetched checkout".into())
        })?;

        let changed: HashSet<&str> = checkout
            .changed_paths
            .iter()
            .map(String::as_str)
            .collect();

        let mut findings_per_file: HashMap<&str, usize> = HashMap::new();
        let mut impacted_findings = 0;

        for finding in &state.static_findings {
            let path = finding.location.path.as_str();
            if changed.contains(path) {
                impacted_findings += 1;
                *findings_per_file.entry(path).or_default() += 1;
            }
        }

        let files_with_findings = findings_per_file.len();
        let impact_score = if changed.is_empty() {
            0.0
        } else {
            files_with_findings as f32 / changed.len() as f32
        };

        let mut hotspots: Vec<(&str, usize)> = findings_per_file.into_iter().collect();
        hotspots.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let hotspots: Vec<String> = hotspots
            .into_iter()
            .take(MAX_HOTSPOTS)
            .map(|(path, _)| path.to_string())
            .collect();

        debug!(
            scan_id = %state.scan_id,
            changed = changed.len(),
            impacted_findings,
            "Impact analysis finished"
        );

        state.impact = Some(ImpactAnalysis {
            changed_files: changed.len(),
            impacted_findings,
            impact_score,
            hotspots,
        });

        Ok(state)
    }
}
