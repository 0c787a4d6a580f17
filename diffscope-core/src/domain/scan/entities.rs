//! Scan domain entities
//!
//! [`ScanState`] is the mutable context threaded through one pipeline run.
//! It is owned exclusively by the engine run processing it; other jobs never
//! observe it. Payload fields are populated progressively as stages complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::value_objects::{
    Confidence, FindingCategory, Location, ScanRequest, ScanType, Severity,
};
use crate::domain::stage::StageFailure;

/// A finding produced by the pipeline (unified format)
///
/// Every analysis stage that emits findings uses this shape so downstream
/// stages can aggregate and enrich without knowing which rule produced them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Finding {
    /// Unique finding identifier
    pub id: String,
    /// Rule identifier that triggered this finding
    pub rule_id: String,
    pub category: FindingCategory,
    pub severity: Severity,
    pub confidence: Confidence,
    pub location: Location,
    /// Human-readable description
    pub description: String,
    /// LLM-generated enrichment, populated by the llm-analysis stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<FindingEnrichment>,
}

/// LLM-generated enrichment data for a finding
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct FindingEnrichment {
    /// Explanation of why the finding matters in context
    pub explanation: Option<String>,
    /// Suggested remediation
    pub suggestion: Option<String>,
    pub enriched_at: Option<DateTime<Utc>>,
}

/// A file collected by the fetch stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the checkout root
    pub path: String,
    /// Detected language, by extension
    pub language: Option<String>,
    pub size_bytes: u64,
}

/// Reference to the fetched code produced by the fetch stage
///
/// Holds the file index, not file contents; later stages read from disk
/// under `root_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCheckout {
    /// Absolute path of the checkout on the local filesystem
    pub root_path: String,
    pub files: Vec<SourceFile>,
    /// Languages detected across the checkout
    pub languages: Vec<String>,
    /// Paths touched by the PR under analysis; empty for project scans
    pub changed_paths: Vec<String>,
}

/// Per-file source facts produced by the parse stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    pub language: Option<String>,
    pub lines: usize,
    /// Function/method declarations found
    pub functions: usize,
}

/// Parsed-source index produced by the parse stage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParsedSource {
    pub files: Vec<ParsedFile>,
}

/// PR-path impact analysis result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImpactAnalysis {
    /// Files changed by the PR
    pub changed_files: usize,
    /// Findings located in changed files
    pub impacted_findings: usize,
    /// 0.0 (no impact) to 1.0 (every changed file carries findings)
    pub impact_score: f32,
    /// Changed files ranked by finding count
    pub hotspots: Vec<String>,
}

/// Per-language aggregate for project scans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LanguageStats {
    pub language: String,
    pub files: usize,
    pub lines: usize,
}

/// Project-path aggregation result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummary {
    pub total_files: usize,
    pub total_lines: usize,
    pub by_language: Vec<LanguageStats>,
}

/// Outcome of the llm-analysis stage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LlmReview {
    /// Findings enriched this run
    pub enriched: usize,
    /// True when no provider is configured and the stage degraded to a skip
    pub skipped: bool,
}

/// Report summary statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ReportSummary {
    pub total_findings: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl ReportSummary {
    /// Tally severity counts over a set of findings.
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self {
            total_findings: findings.len(),
            ..Self::default()
        };

        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }
}

/// Final (or best-effort partial) scan report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub scan_type: ScanType,
    pub repository: String,
    pub summary: ReportSummary,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_review: Option<LlmReview>,
    /// True when the error-handling stage assembled this from an aborted run
    pub partial: bool,
    /// The failure that aborted the run, for partial reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageFailure>,
    pub generated_at: DateTime<Utc>,
}

/// The mutable context threaded through all stages of one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanState {
    pub scan_id: Uuid,
    pub scan_type: ScanType,
    pub repository: String,
    pub pr_id: Option<u64>,
    pub branch: Option<String>,

    // Payload fields, populated progressively by stages
    pub checkout: Option<SourceCheckout>,
    pub parsed: Option<ParsedSource>,
    pub static_findings: Vec<Finding>,
    pub impact: Option<ImpactAnalysis>,
    pub project_summary: Option<ProjectSummary>,
    pub llm_review: Option<LlmReview>,
    pub report: Option<ScanReport>,

    /// Set by the engine when a stage fails; forces routing to the
    /// error-handling stage
    pub error: Option<StageFailure>,
}

impl ScanState {
    pub fn new(scan_id: Uuid, request: &ScanRequest) -> Self {
        Self {
            scan_id,
            scan_type: request.scan_type,
            repository: request.repository.clone(),
            pr_id: request.pr_id,
            branch: request.branch.clone(),
            checkout: None,
            parsed: None,
            static_findings: Vec::new(),
            impact: None,
            project_summary: None,
            llm_review: None,
            report: None,
            error: None,
        }
    }
}
