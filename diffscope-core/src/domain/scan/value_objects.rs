//! Scan value objects

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What kind of scan a request asks for
///
/// The scan type is the single routing discriminant in the pipeline: `pr`
/// scans traverse impact analysis, `project` scans traverse the
/// whole-project aggregation stage. Both converge at LLM analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// Analyze a pull-request diff against its repository
    Pr,
    /// Analyze an entire repository checkout
    Project,
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pr => write!(f, "pr"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Finding severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// Finding confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Category a static rule or analysis assigns to a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FindingCategory {
    /// Potential security issue (secrets, injection, unsafe patterns)
    Security,
    /// Likely bug or correctness hazard
    Correctness,
    /// Maintainability and hygiene
    Maintainability,
}

/// Location of a finding in the checkout
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// File path relative to the checkout root
    pub path: String,
    /// Line number (1-indexed)
    pub line: Option<u32>,
}

/// A scan submission as accepted by the job queue service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// Repository checkout location
    pub repository: String,
    /// Pull request identifier; required for `pr` scans
    pub pr_id: Option<u64>,
    /// Branch under analysis, informational
    pub branch: Option<String>,
}

impl ScanRequest {
    /// Check the request is internally consistent before a job is allocated.
    pub fn validate(&self) -> Result<(), ScanRequestError> {
        if self.repository.trim().is_empty() {
            return Err(ScanRequestError::MissingRepository);
        }

        if self.scan_type == ScanType::Pr && self.pr_id.is_none() {
            return Err(ScanRequestError::MissingPrId);
        }

        Ok(())
    }
}

/// Error for malformed scan requests, surfaced synchronously at submission
#[derive(Debug, thiserror::Error)]
pub enum ScanRequestError {
    #[error("repository must not be empty")]
    MissingRepository,

    #[error("pr scans require a pr_id")]
    MissingPrId,
}
