//! Static analysis stage: built-in rule set over the checkout
//!
//! Rules are line-oriented regexes, optionally scoped to languages, and emit
//! findings in the unified format. Finding ids are deterministic
//! (`rule:path:line`) so repeated scans of the same checkout agree.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use diffscope_core::domain::scan::{
    Confidence, Finding, FindingCategory, Location, ScanState, Severity,
};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

/// One built-in rule
struct StaticRule {
    id: &'static str,
    description: &'static str,
    category: FindingCategory,
    severity: Severity,
    confidence: Confidence,
    pattern: Regex,
    /// Restrict to these languages; `None` applies everywhere
    languages: Option<&'static [&'static str]>,
}

impl StaticRule {
    fn applies_to(&self, language: Option<&str>) -> bool {
        match self.languages {
            None => true,
            Some(languages) => language.is_some_and(|l| languages.contains(&l)),
        }
    }
}

pub struct StaticAnalysisStage {
    rules: Vec<StaticRule>,
    max_findings_per_file: usize,
}

impl StaticAnalysisStage {
    pub fn new() -> Result<Self, StageError> {
        Ok(Self {
            rules: builtin_rules()?,
            max_findings_per_file: 50,
        })
    }

    fn scan_file(&self, path: &str, language: Option<&str>, content: &str) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (index, line) in content.lines().enumerate() {
            for rule in &self.rules {
                if !rule.applies_to(language) || !rule.pattern.is_match(line) {
                    continue;
                }

                let line_number = (index + 1) as u32;
                findings.push(Finding {
                    id: format!("{}:{}:{}", rule.id, path, line_number),
                    rule_id: rule.id.to_string(),
                    category: rule.category,
                    severity: rule.severity,
                    confidence: rule.confidence,
                    location: Location {
                        path: path.to_string(),
                        line: Some(line_number),
                    },
                    description: rule.description.to_string(),
                    enrichment: None,
                });

                if findings.len() >= self.max_findings_per_file {
                    return findings;
                }
            }
        }

        findings
    }
}

#[async_trait]
impl Stage for StaticAnalysisStage {
    fn name(&self) -> StageName {
        StageName::StaticAnalysis
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let checkout = state.checkout.as_ref().ok_or_else(|| {
            StageError::InvalidInput("static analysis requires a fetched checkout".into())
        })?;

        let root = Path::new(&checkout.root_path);
        let mut findings = Vec::new();

        for file in &checkout.files {
            let Ok(content) = tokio::fs::read_to_string(root.join(&file.path)).await else {
                continue; // binary or unreadable
            };
            findings.extend(self.scan_file(&file.path, file.language.as_deref(), &content));
        }

        findings.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.location.path.cmp(&b.location.path))
        });

        debug!(scan_id = %state.scan_id, findings = findings.len(), "Static analysis finished");
        state.static_findings = findings;
        Ok(state)
    }
}

fn builtin_rules() -> Result<Vec<StaticRule>, StageError> {
    let rule = |id,
                description,
                category,
                severity,
                confidence,
                pattern: &str,
                languages|
     -> Result<StaticRule, StageError> {
        Ok(StaticRule {
            id,
            description,
            category,
            severity,
            confidence,
            pattern: Regex::new(pattern).map_err(|e| StageError::InvalidInput(e.to_string()))?,
            languages,
        })
    };

    Ok(vec![
        rule(
            "DS1001",
            "Possible hardcoded credential",
            FindingCategory::Security,
            Severity::High,
            Confidence::Medium,
            r#"(?i)\b(password|passwd|secret|api_key|apikey|auth_token)\b\s*[:=]\s*["'][^"']{4,}["']"#,
            None,
        )?,
        rule(
            "DS1002",
            "Private key material committed to the repository",
            FindingCategory::Security,
            Severity::Critical,
            Confidence::High,
            r"-----BEGIN (?:RSA |EC |OPENSSH )?PRIVATE KEY-----",
            None,
        )?,
        rule(
            "DS2001",
            "SQL built by string concatenation",
            FindingCategory::Security,
            Severity::High,
            Confidence::Low,
            r#"(?i)\b(SELECT|INSERT|UPDATE|DELETE)\b[^"']*["'][^"']*["']\s*\+"#,
            None,
        )?,
        rule(
            "DS2002",
            "Dynamic code evaluation",
            FindingCategory::Security,
            Severity::Medium,
            Confidence::Medium,
            r"\beval\s*\(",
            Some(&["python", "javascript", "typescript"]),
        )?,
        rule(
            "DS3001",
            "unwrap() outside test code may panic",
            FindingCategory::Correctness,
            Severity::Low,
            Confidence::Medium,
            r"\.unwrap\(\)",
            Some(&["rust"]),
        )?,
        rule(
            "DS3002",
            "Debug print left in source",
            FindingCategory::Maintainability,
            Severity::Info,
            Confidence::High,
            r"(?:\bconsole\.log\s*\(|^\s*print\s*\(|\bdbg!\s*\()",
            Some(&["rust", "python", "javascript", "typescript"]),
        )?,
        rule(
            "DS4001",
            "Unresolved task marker",
            FindingCategory::Maintainability,
            Severity::Info,
            Confidence::Medium,
            r"\b(TODO|FIXME|XXX)\b",
            None,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_hardcoded_credential() {
        let stage = StaticAnalysisStage::new().unwrap();
        let findings = stage.scan_file(
            "settings.py",
            Some("python"),
            "password = \"hunter22\"\nname = \"app\"\n",
        );

        assert!(findings.iter().any(|f| f.rule_id == "DS1001"));
        assert_eq!(findings[0].location.line, Some(1));
    }

    #[test]
    fn test_language_scoped_rule_skips_other_languages() {
        let stage = StaticAnalysisStage::new().unwrap();

        let rust = stage.scan_file("main.rs", Some("rust"), "let x = value.unwrap();\n");
        assert!(rust.iter().any(|f| f.rule_id == "DS3001"));

        let go = stage.scan_file("main.go", Some("go"), "x := value.unwrap()\n");
        assert!(!go.iter().any(|f| f.rule_id == "DS3001"));
    }

    #[test]
    fn test_finding_ids_are_deterministic() {
        let stage = StaticAnalysisStage::new().unwrap();
        let a = stage.scan_file("a.py", Some("python"), "eval(user_input)\n");
        let b = stage.scan_file("a.py", Some("python"), "eval(user_input)\n");

        assert_eq!(a.len(), 1);
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn test_findings_capped_per_file() {
        let stage = StaticAnalysisStage::new().unwrap();
        let content = "// TODO: one\n".repeat(500);
        let findings = stage.scan_file("big.rs", Some("rust"), &content);

        assert_eq!(findings.len(), 50);
    }
}
