//! Declarative transition table for the scan pipeline
//!
//! Routing is a fixed backbone with exactly one conditional fork, resolved by
//! `ScanState.scan_type`:
//!
//! ```text
//! fetch ─► parse ─► static-analysis ─┬─► impact-analysis ──┬─► llm-analysis ─► reporting ─► end
//!                                    └─► project-scan ─────┘
//! error-handler ─► end
//! ```
//!
//! The universal error edge (any stage failure → error-handler) is owned by
//! the engine, not the table. A missing or duplicate rule is a configuration
//! defect: [`TransitionTable::validate`] runs at startup and makes it fatal
//! there instead of at scan time.

use diffscope_core::domain::scan::{ScanState, ScanType};
use diffscope_core::domain::stage::StageName;

/// Where a rule sends the pipeline next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unconditional edge
    To(StageName),
    /// The single conditional fork, keyed on the scan type
    ForkByScanType { pr: StageName, project: StageName },
}

/// Routing error: either a configuration defect caught by validation, or a
/// lookup for a stage the table does not know (which validation prevents
/// from ever happening at scan time).
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("No transition rule for stage {0}")]
    MissingRule(StageName),

    #[error("Duplicate transition rule for stage {0}")]
    DuplicateRule(StageName),

    #[error("Transition rule declared for terminal stage {0}")]
    RuleForTerminal(StageName),

    #[error("Pipeline for {scan_type} scans does not terminate (cycle through {stage})")]
    NonTerminating {
        scan_type: ScanType,
        stage: StageName,
    },
}

/// Declarative map from a completed stage to its successor
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: Vec<(StageName, Route)>,
}

impl TransitionTable {
    /// The standard scan pipeline.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                (StageName::Fetch, Route::To(StageName::Parse)),
                (StageName::Parse, Route::To(StageName::StaticAnalysis)),
                (
                    StageName::StaticAnalysis,
                    Route::ForkByScanType {
                        pr: StageName::ImpactAnalysis,
                        project: StageName::ProjectScan,
                    },
                ),
                (StageName::ImpactAnalysis, Route::To(StageName::LlmAnalysis)),
                (StageName::ProjectScan, Route::To(StageName::LlmAnalysis)),
                (StageName::LlmAnalysis, Route::To(StageName::Reporting)),
                (StageName::Reporting, Route::To(StageName::End)),
                (StageName::ErrorHandler, Route::To(StageName::End)),
            ],
        }
    }

    /// Build a table from explicit rules (used by tests and custom pipelines).
    pub fn from_rules(rules: Vec<(StageName, Route)>) -> Self {
        Self { rules }
    }

    /// The stage every run starts at.
    pub fn start_stage(&self) -> StageName {
        StageName::Fetch
    }

    /// Decide the next stage after `from` completed with `state`.
    pub fn next(&self, from: StageName, state: &ScanState) -> Result<StageName, RoutingError> {
        let route = self
            .rules
            .iter()
            .find(|(stage, _)| *stage == from)
            .map(|(_, route)| route)
            .ok_or(RoutingError::MissingRule(from))?;

        Ok(match route {
            Route::To(next) => *next,
            Route::ForkByScanType { pr, project } => match state.scan_type {
                ScanType::Pr => *pr,
                ScanType::Project => *project,
            },
        })
    }

    /// Every stage that appears as a rule source or a route target
    /// (excluding the terminal marker).
    pub fn routable_stages(&self) -> Vec<StageName> {
        let mut stages = Vec::new();
        let mut push = |stage: StageName| {
            if stage != StageName::End && !stages.contains(&stage) {
                stages.push(stage);
            }
        };

        for (from, route) in &self.rules {
            push(*from);
            match route {
                Route::To(to) => push(*to),
                Route::ForkByScanType { pr, project } => {
                    push(*pr);
                    push(*project);
                }
            }
        }

        stages
    }

    /// Exhaustive startup validation.
    ///
    /// Checks that rules are unique, no rule hangs off the terminal marker,
    /// the error sink has an exit edge, and that both scan types reach `End`
    /// from the start stage without cycling.
    pub fn validate(&self) -> Result<(), RoutingError> {
        for (i, (stage, _)) in self.rules.iter().enumerate() {
            if *stage == StageName::End {
                return Err(RoutingError::RuleForTerminal(*stage));
            }
            if self.rules[..i].iter().any(|(other, _)| other == stage) {
                return Err(RoutingError::DuplicateRule(*stage));
            }
        }

        if !self
            .rules
            .iter()
            .any(|(stage, _)| *stage == StageName::ErrorHandler)
        {
            return Err(RoutingError::MissingRule(StageName::ErrorHandler));
        }

        for scan_type in [ScanType::Pr, ScanType::Project] {
            self.walk_to_end(scan_type)?;
        }

        Ok(())
    }

    /// Follow the table from the start stage for `scan_type` until `End`,
    /// bounding the walk by the rule count to detect cycles.
    fn walk_to_end(&self, scan_type: ScanType) -> Result<(), RoutingError> {
        let probe = probe_state(scan_type);
        let mut current = self.start_stage();

        for _ in 0..=self.rules.len() {
            if current == StageName::End {
                return Ok(());
            }
            current = self.next(current, &probe)?;
        }

        Err(RoutingError::NonTerminating {
            scan_type,
            stage: current,
        })
    }
}

/// Synthetic state used only to evaluate the scan-type fork during validation.
fn probe_state(scan_type: ScanType) -> ScanState {
    use diffscope_core::domain::scan::ScanRequest;
    use uuid::Uuid;

    ScanState::new(
        Uuid::nil(),
        &ScanRequest {
            scan_type,
            repository: String::new(),
            pr_id: None,
            branch: None,
        },
    )
}
