//! Scan domain: requests, findings, and the state threaded through the pipeline

pub mod entities;
pub mod value_objects;

pub use entities::{
    Finding, FindingEnrichment, ImpactAnalysis, LanguageStats, LlmReview, ParsedFile,
    ParsedSource, ProjectSummary, ReportSummary, ScanReport, ScanState, SourceCheckout,
    SourceFile,
};
pub use value_objects::{
    Confidence, FindingCategory, Location, ScanRequest, ScanRequestError, ScanType, Severity,
};
