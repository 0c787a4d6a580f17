//! Stage value objects

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Stage identifier
///
/// Names every step of the scan pipeline, plus the `End` marker the
/// transition table routes to when a run is finished. `End` has no
/// implementation; the engine stops when routing reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Fetch,
    Parse,
    StaticAnalysis,
    ImpactAnalysis,
    ProjectScan,
    LlmAnalysis,
    Reporting,
    ErrorHandler,
    End,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::StaticAnalysis => "static-analysis",
            Self::ImpactAnalysis => "impact-analysis",
            Self::ProjectScan => "project-scan",
            Self::LlmAnalysis => "llm-analysis",
            Self::Reporting => "reporting",
            Self::ErrorHandler => "error-handler",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage failed, for observability and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StageErrorKind {
    /// The stage returned an error
    Execution,
    /// The per-stage timeout expired
    Timeout,
    /// The stage panicked
    Panic,
}

/// Structured record of the stage failure that aborted a run
///
/// Stored on the scan state when the engine reroutes to the error-handling
/// stage, and surfaced as the job's `error_detail`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageFailure {
    /// The stage that failed
    pub stage: StageName,
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageFailure {
    pub fn execution(stage: StageName, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: StageErrorKind::Execution,
            message: message.into(),
        }
    }

    pub fn timeout(stage: StageName, timeout: Duration) -> Self {
        Self {
            stage,
            kind: StageErrorKind::Timeout,
            message: format!("stage exceeded its {}s timeout", timeout.as_secs()),
        }
    }

    pub fn panic(stage: StageName, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: StageErrorKind::Panic,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} failed: {}", self.stage, self.message)
    }
}

/// Execution context handed to a stage invocation
///
/// Carries the cooperative cancellation signal and the per-stage timeout
/// only. Stages must not use it to reach back into the job registry.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub cancellation: CancellationToken,
    pub timeout: Duration,
}

impl StageContext {
    pub fn new(cancellation: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancellation,
            timeout,
        }
    }

    /// Whether the owning job has been asked to cancel.
    ///
    /// Long-running stages may poll this to bail out early; the engine
    /// itself only honors cancellation at stage boundaries.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Stage execution error
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Stage execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid stage input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
