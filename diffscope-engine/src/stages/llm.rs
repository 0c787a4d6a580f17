//! LLM analysis stage: finding enrichment through a provider seam
//!
//! The stage talks to an [`LlmProvider`]; the shipped implementation posts a
//! chat-completion request over HTTP. When no provider is configured the
//! stage degrades to a recorded skip rather than failing the scan. Provider
//! errors are stage failures and route to the error sink like any other.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use diffscope_core::config::LlmConfig;
use diffscope_core::domain::scan::{Finding, FindingEnrichment, LlmReview, ScanState};
use diffscope_core::domain::stage::{Stage, StageContext, StageError, StageName};

/// Errors from an LLM provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Seam between the pipeline and whichever model backs enrichment
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn review(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Chat-completions HTTP provider
pub struct HttpLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn review(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("HTTP {status}: {detail}")));
        }

        let value: serde_json::Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::MalformedResponse("missing choices[0].message.content".into())
            })
    }
}

pub struct LlmAnalysisStage {
    provider: Option<Arc<dyn LlmProvider>>,
    max_findings: usize,
}

impl LlmAnalysisStage {
    pub fn new(provider: Arc<dyn LlmProvider>, max_findings: usize) -> Self {
        Self {
            provider: Some(provider),
            max_findings,
        }
    }

    /// Stage variant used when enrichment is turned off: records a skip and
    /// passes the state through unchanged.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            max_findings: 0,
        }
    }

    fn prompt_for(finding: &Finding) -> String {
        format!(
            "A static analysis rule flagged the following issue.\n\
             Rule: {}\n\
             Description: {}\n\
             Location: {}:{}\n\
             Explain the risk in context and suggest a fix, briefly.",
            finding.rule_id,
            finding.description,
            finding.location.path,
            finding.location.line.unwrap_or(0),
        )
    }
}

#[async_trait]
impl Stage for LlmAnalysisStage {
    fn name(&self) -> StageName {
        StageName::LlmAnalysis
    }

    async fn execute(
        &self,
        mut state: ScanState,
        _ctx: &StageContext,
    ) -> Result<ScanState, StageError> {
        let Some(provider) = &self.provider else {
            debug!(scan_id = %state.scan_id, "No LLM provider configured, skipping enrichment");
            state.llm_review = Some(LlmReview {
                enriched: 0,
                skipped: true,
            });
            return Ok(state);
        };

        // Highest severity first; Severity orders Critical before Info
        let mut order: Vec<usize> = (0..state.static_findings.len()).collect();
        order.sort_by_key(|&i| state.static_findings[i].severity);

        let mut enriched = 0;
        for &index in order.iter().take(self.max_findings) {
            let prompt = Self::prompt_for(&state.static_findings[index]);
            let explanation = provider
                .review(&prompt)
                .await
                .map_err(|e| StageError::ExecutionFailed(format!("llm provider: {e}")))?;

            state.static_findings[index].enrichment = Some(FindingEnrichment {
                explanation: Some(explanation),
                suggestion: None,
                enriched_at: Some(Utc::now()),
            });
            enriched += 1;
        }

        info!(scan_id = %state.scan_id, enriched, "LLM enrichment finished");
        state.llm_review = Some(LlmReview {
            enriched,
            skipped: false,
        });
        Ok(state)
    }
}
