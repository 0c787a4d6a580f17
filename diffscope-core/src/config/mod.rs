//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub scan: ScanConfig,
    pub llm: LlmConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Expose the Swagger UI and OpenAPI document
    pub enable_docs: bool,
    /// Per-request timeout applied by the HTTP layer
    pub request_timeout_seconds: u64,
    /// Grace period for background tasks on shutdown
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_docs: true,
            request_timeout_seconds: 30,
            shutdown_timeout_seconds: 5,
        }
    }
}

/// Logging output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// Newline-delimited JSON for log shippers
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridable via `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,tower_http=warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Workflow engine and job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool size; bounds how many scans execute concurrently
    pub max_concurrent_jobs: usize,
    /// Per-stage execution timeout; expiry is routed to the error-handling stage
    pub stage_timeout_seconds: u64,
    /// How often the cleanup task sweeps terminal jobs
    pub cleanup_interval_seconds: u64,
    /// Retention window for terminal jobs before cleanup removes them
    pub job_retention_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            stage_timeout_seconds: 300,
            cleanup_interval_seconds: 300,
            job_retention_seconds: 86_400,
        }
    }
}

/// Source checkout scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns excluded from the checkout walk
    pub exclude_patterns: Vec<String>,
    /// Files larger than this are skipped by the pipeline
    pub max_file_size_bytes: u64,
    /// Upper bound on files collected per checkout
    pub max_files: usize,
    /// Unified diff handed over by CI for PR scans, relative to the checkout root
    pub diff_file: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec![
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/vendor/**".to_string(),
                "**/*.min.js".to_string(),
            ],
            max_file_size_bytes: 1_000_000,
            max_files: 5_000,
            diff_file: "pr.diff".to_string(),
        }
    }
}

/// LLM enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Disabled by default; the llm-analysis stage degrades to a no-op skip
    pub enabled: bool,
    /// Chat-completions endpoint
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Per-call timeout for the provider client
    pub timeout_seconds: u64,
    /// How many findings (ordered by severity) are sent for enrichment
    pub max_findings: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 60,
            max_findings: 10,
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.engine.validate()?;
        self.scan.validate()?;
        self.llm.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("DIFFSCOPE").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_llm_is_disabled() {
        let config = Config::default();
        assert!(!config.llm.enabled);
    }
}
