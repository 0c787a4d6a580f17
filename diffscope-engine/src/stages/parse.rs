//! Parse stage: lightweight per-file source facts
//!
//! Produces the parsed-source index later stages correlate against: line
//! counts and function declaration counts per file, via per-language
//! regexes. Deliberately shallow; a full AST parser slots in behind the same
//! stage contract.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use diffscope_core::domain::scan::{ParsedFile, ParsedSource, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

pub struct ParseStage {
    function_patterns: Vec<(&'static str, Regex)>,
}

impl ParseStage {
    pub fn new() -> Result<Self, StageError> {
        let patterns = [
            (
                "rust",
                r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+\w+",
            ),
            ("python", r"(?m)^\s*(?:async\s+)?def\s+\w+"),
            ("javascript", r"(?m)\bfunction\b|=>"),
            ("typescript", r"(?m)\bfunction\b|=>"),
            ("go", r"(?m)^func\s+"),
            (
                "java",
                r"(?m)^\s*(?:public|private|protected)\s+[\w<>\[\],\s]+\s+\w+\s*\(",
            ),
        ];

        let mut function_patterns = Vec::with_capacity(patterns.len());
        for (language, pattern) in patterns {
            let regex =
                Regex::new(pattern).map_err(|e| StageError::InvalidInput(e.to_string()))?;
            function_patterns.push((language, regex));
        }

        Ok(Self { function_patterns })
    }

    fn count_functions(&self, language: &str, content: &str) -> usize {
        self.function_patterns
            .iter()
            .find(|(name, _)| *name == language)
            .map(|(_, regex)| regex.find_iter(content).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn name(&self) -> StageName {
        StageName::Parse
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let checkout = state
            .checkout
            .as_ref()
            .ok_or_else(|| StageError::InvalidInput("parse requires a fetched checkout".into()))?;

        let root = Path::new(&checkout.root_path);
        let mut parsed = ParsedSource::default();

        for file in &checkout.files {
            let Some(language) = file.language.clone() else {
                continue;
            };

            let content = match tokio::fs::read_to_string(root.join(&file.path)).await {
                Ok(content) => content,
                Err(e) => {
                    debug!(path = %file.path, error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            parsed.files.push(ParsedFile {
                path: file.path.clone(),
                lines: content.lines().count(),
                functions: self.count_functions(&language, &content),
                language: Some(language),
            });
        }

        debug!(scan_id = %state.scan_id, files = parsed.files.len(), "Source parsed");
        state.parsed = Some(parsed);
        Ok(state)
    }
}
