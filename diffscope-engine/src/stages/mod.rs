//! Built-in pipeline stages
//!
//! Each stage implements the [`Stage`] contract from `diffscope-core` and is
//! registered by name; the engine sequences them without knowing what any of
//! them do. Replacing a built-in with a heavier implementation (a real AST
//! parser, an external rule engine) is a registry change, not an engine
//! change.

pub mod error_handler;
pub mod fetch;
pub mod impact;
pub mod llm;
pub mod parse;
pub mod project_scan;
pub mod report;
pub mod static_analysis;

pub use error_handler::ErrorHandlerStage;
pub use fetch::FetchStage;
pub use impact::ImpactAnalysisStage;
pub use llm::{HttpLlmProvider, LlmAnalysisStage, LlmError, LlmProvider};
pub use parse::ParseStage;
pub use project_scan::ProjectScanStage;
pub use report::ReportingStage;
pub use static_analysis::StaticAnalysisStage;

use std::sync::Arc;

use diffscope_core::config::Config;
use diffscope_core::domain::stage::StageError;

use crate::infrastructure::stage_registry::StageRegistry;

/// Build the full default pipeline registry from configuration.
pub fn default_registry(config: &Config) -> Result<StageRegistry, StageError> {
    let mut registry = StageRegistry::new();

    registry.register(Arc::new(FetchStage::new(&config.scan)?));
    registry.register(Arc::new(ParseStage::new()?));
    registry.register(Arc::new(StaticAnalysisStage::new()?));
    registry.register(Arc::new(ImpactAnalysisStage));
    registry.register(Arc::new(ProjectScanStage));

    let llm_stage = if config.llm.enabled {
        let provider = HttpLlmProvider::new(&config.llm)
            .map_err(|e| StageError::ExecutionFailed(format!("llm provider setup: {e}")))?;
        LlmAnalysisStage::new(Arc::new(provider), config.llm.max_findings)
    } else {
        LlmAnalysisStage::disabled()
    };
    registry.register(Arc::new(llm_stage));

    registry.register(Arc::new(ReportingStage));
    registry.register(Arc::new(ErrorHandlerStage));

    Ok(registry)
}
