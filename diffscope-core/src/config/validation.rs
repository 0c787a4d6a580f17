//! Configuration validation module

use crate::config::{EngineConfig, LlmConfig, LoggingConfig, ScanConfig, ServerConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Engine configuration error: {message}")]
    Engine { message: String },

    #[error("Scan configuration error: {message}")]
    Scan { message: String },

    #[error("LLM configuration error: {message}")]
    Llm { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan {
            message: message.into(),
        }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // Note: u16 cannot exceed 65535, so we only need to check for 0
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty".to_string()));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ValidationError::server(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_jobs == 0 {
            return Err(ValidationError::engine(
                "max_concurrent_jobs must be greater than 0".to_string(),
            ));
        }

        if self.stage_timeout_seconds == 0 {
            return Err(ValidationError::engine(
                "stage_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.cleanup_interval_seconds == 0 {
            return Err(ValidationError::engine(
                "cleanup_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.job_retention_seconds == 0 {
            return Err(ValidationError::engine(
                "job_retention_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for ScanConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_files == 0 {
            return Err(ValidationError::scan(
                "max_files must be greater than 0".to_string(),
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(ValidationError::scan(
                "max_file_size_bytes must be greater than 0".to_string(),
            ));
        }

        if self.diff_file.is_empty() {
            return Err(ValidationError::scan(
                "diff_file cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for LlmConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ValidationError::llm(format!(
                "api_url must start with http:// or https://, got: {}",
                self.api_url
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(ValidationError::llm(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.max_findings == 0 {
            return Err(ValidationError::llm(
                "max_findings must be greater than 0 when enrichment is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.level.is_empty() {
            return Err(ValidationError::logging(
                "Log level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_validation() {
        let valid = ServerConfig::default();
        assert!(valid.validate().is_ok());

        let invalid = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(invalid.validate().is_err());

        let invalid = ServerConfig {
            host: String::new(),
            ..ServerConfig::default()
        };
        assert!(invalid.validate().is_err());

        let invalid = ServerConfig {
            request_timeout_seconds: 0,
            ..ServerConfig::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_engine_config_validation() {
        let valid = EngineConfig::default();
        assert!(valid.validate().is_ok());

        let invalid = EngineConfig {
            max_concurrent_jobs: 0,
            ..EngineConfig::default()
        };
        assert!(invalid.validate().is_err());

        let invalid = EngineConfig {
            stage_timeout_seconds: 0,
            ..EngineConfig::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_llm_config_validation() {
        // Disabled LLM config skips URL checks entirely
        let disabled = LlmConfig {
            enabled: false,
            api_url: "not-a-url".to_string(),
            ..LlmConfig::default()
        };
        assert!(disabled.validate().is_ok());

        let invalid = LlmConfig {
            enabled: true,
            api_url: "not-a-url".to_string(),
            ..LlmConfig::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_scan_config_validation() {
        assert!(ScanConfig::default().validate().is_ok());

        let invalid = ScanConfig {
            max_files: 0,
            ..ScanConfig::default()
        };
        assert!(invalid.validate().is_err());
    }
}
