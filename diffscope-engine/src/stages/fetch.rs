//! Fetch stage: resolve the checkout on disk and index its files
//!
//! Walks the repository checkout, skipping excluded and oversized entries,
//! and detects languages by extension. For PR scans it additionally resolves
//! the changed-file set from the unified diff the CI handoff places at the
//! checkout root.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use diffscope_core::config::ScanConfig;
use diffscope_core::domain::scan::{ScanState, ScanType, SourceCheckout, SourceFile};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

pub struct FetchStage {
    excludes: GlobSet,
    max_files: usize,
    max_file_size_bytes: u64,
    diff_file: String,
    diff_header: Regex,
}

impl FetchStage {
    pub fn new(config: &ScanConfig) -> Result<Self, StageError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                StageError::InvalidInput(format!("bad exclude pattern {pattern:?}: {e}"))
            })?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .map_err(|e| StageError::InvalidInput(e.to_string()))?;

        let diff_header = Regex::new(r"^\+\+\+ b/(.+)$")
            .map_err(|e| StageError::InvalidInput(e.to_string()))?;

        Ok(Self {
            excludes,
            max_files: config.max_files,
            max_file_size_bytes: config.max_file_size_bytes,
            diff_file: config.diff_file.clone(),
            diff_header,
        })
    }

    fn language_for(path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        let language = match ext {
            "rs" => "rust",
            "py" => "python",
            "js" | "jsx" | "mjs" => "javascript",
            "ts" | "tsx" => "typescript",
            "go" => "go",
            "java" => "java",
            "kt" | "kts" => "kotlin",
            "rb" => "ruby",
            "php" => "php",
            "c" | "h" => "c",
            "cc" | "cpp" | "hpp" => "cpp",
            "cs" => "csharp",
            "swift" => "swift",
            _ => return None,
        };
        Some(language.to_string())
    }

    fn collect_files(&self, root: &Path) -> Vec<SourceFile> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue, // skip inaccessible entries
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative_str = relative.to_string_lossy().to_string();

            if relative_str == self.diff_file || self.excludes.is_match(relative) {
                continue;
            }

            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size_bytes > self.max_file_size_bytes {
                debug!(path = %relative_str, size_bytes, "Skipping oversized file");
                continue;
            }

            files.push(SourceFile {
                language: Self::language_for(relative),
                path: relative_str,
                size_bytes,
            });

            if files.len() >= self.max_files {
                debug!(max_files = self.max_files, "File cap reached, truncating walk");
                break;
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Paths touched by the PR, parsed from the `+++ b/<path>` headers of the
    /// unified diff. Deleted files show up as `+++ /dev/null` and are ignored.
    async fn changed_paths(&self, root: &Path) -> Result<Vec<String>, StageError> {
        let diff_path = root.join(&self.diff_file);
        let content = tokio::fs::read_to_string(&diff_path).await.map_err(|_| {
            StageError::InvalidInput(format!(
                "pr scan requires a unified diff at {}",
                diff_path.display()
            ))
        })?;

        let mut paths = BTreeSet::new();
        for line in content.lines() {
            if let Some(captures) = self.diff_header.captures(line) {
                paths.insert(captures[1].to_string());
            }
        }

        Ok(paths.into_iter().collect())
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn name(&self) -> StageName {
        StageName::Fetch
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let root = PathBuf::from(&state.repository);
        if !root.is_dir() {
            return Err(StageError::InvalidInput(format!(
                "repository checkout not found: {}",
                state.repository
            )));
        }

        let files = self.collect_files(&root);

        let languages: BTreeSet<String> = files
            .iter()
            .filter_map(|file| file.language.clone())
            .collect();

        let changed_paths = match state.scan_type {
            ScanType::Pr => self.changed_paths(&root).await?,
            ScanType::Project => Vec::new(),
        };

        debug!(
            scan_id = %state.scan_id,
            files = files.len(),
            changed = changed_paths.len(),
            "Checkout indexed"
        );

        state.checkout = Some(SourceCheckout {
            root_path: root.to_string_lossy().to_string(),
            files,
            languages: languages.into_iter().collect(),
            changed_paths,
        });

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffscope_core::domain::scan::ScanRequest;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn ctx() -> StageContext {
        StageContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    fn state(scan_type: ScanType, repository: &str) -> ScanState {
        ScanState::new(
            Uuid::new_v4(),
            &ScanRequest {
                scan_type,
                repository: repository.to_string(),
                pr_id: (scan_type == ScanType::Pr).then_some(1),
                branch: None,
            },
        )
    }

    #[tokio::test]
    async fn test_project_fetch_indexes_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("util.py"), "def util():\n    pass\n").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        std::fs::write(dir.path().join("node_modules/dep/index.js"), "x").unwrap();

        let stage = FetchStage::new(&ScanConfig::default()).unwrap();
        let result = stage
            .execute(state(ScanType::Project, &dir.path().to_string_lossy()), &ctx())
            .await
            .unwrap();

        let checkout = result.checkout.expect("checkout populated");
        let paths: Vec<&str> = checkout.files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"main.rs"));
        assert!(paths.contains(&"util.py"));
        assert!(
            !paths.iter().any(|p| p.contains("node_modules")),
            "excluded directories must not be indexed"
        );
        assert!(checkout.languages.contains(&"rust".to_string()));
        assert!(checkout.languages.contains(&"python".to_string()));
        assert!(checkout.changed_paths.is_empty());
    }

    #[tokio::test]
    async fn test_pr_fetch_resolves_changed_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(
            dir.path().join("pr.diff"),
            "--- a/main.rs\n+++ b/main.rs\n@@ -1 +1 @@\n-fn main() {}\n+fn main() { run(); }\n\
             --- a/gone.rs\n+++ /dev/null\n",
        )
        .unwrap();

        let stage = FetchStage::new(&ScanConfig::default()).unwrap();
        let result = stage
            .execute(state(ScanType::Pr, &dir.path().to_string_lossy()), &ctx())
            .await
            .unwrap();

        let checkout = result.checkout.unwrap();
        assert_eq!(checkout.changed_paths, vec!["main.rs".to_string()]);
        assert!(
            !checkout.files.iter().any(|f| f.path == "pr.diff"),
            "the diff handoff file is not part of the checkout index"
        );
    }

    #[tokio::test]
    async fn test_pr_fetch_without_diff_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();

        let stage = FetchStage::new(&ScanConfig::default()).unwrap();
        let err = stage
            .execute(state(ScanType::Pr, &dir.path().to_string_lossy()), &ctx())
            .await
            .expect_err("pr scan without a diff must fail");

        assert!(matches!(err, StageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_repository_fails() {
        let stage = FetchStage::new(&ScanConfig::default()).unwrap();
        let err = stage
            .execute(state(ScanType::Project, "/nonexistent/checkout"), &ctx())
            .await
            .expect_err("missing checkout must fail");

        assert!(matches!(err, StageError::InvalidInput(_)));
    }
}
