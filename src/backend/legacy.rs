//! Legacy report-embedded question client
//!
//! The legacy endpoint has no session: every request carries the full report
//! text with the question appended, and answers come back in the external
//! model's `candidates` schema. It is the only flow that retries.

use crate::backend::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::backend::types::{
    AnalysisRequest, CandidatesResponse, Content, GenerationConfig, Part, SystemInstruction,
};
use crate::backend::{FollowUpContext, FollowUpService};
use crate::config::{BackendConfig, FollowUpConfig};
use crate::error::{MedraxError, Result};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

/// Client for the legacy `/ask/` endpoint with bounded retry
pub struct LegacyAskClient {
    client: Client,
    url: String,
    config: FollowUpConfig,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl LegacyAskClient {
    /// Create a new legacy client using the real-time sleeper
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(backend: &BackendConfig, config: FollowUpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(backend.timeout())
            .user_agent(concat!("medrax/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MedraxError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let policy = RetryPolicy::from(&config);
        tracing::info!(
            "Initialized legacy ask client: url={}, max_attempts={}",
            backend.legacy_ask_url,
            policy.max_attempts
        );

        Ok(Self {
            client,
            url: backend.legacy_ask_url.clone(),
            config,
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Active retry policy
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Build the question payload with the report embedded in its text
    pub fn build_request(&self, report: &str, question: &str) -> AnalysisRequest {
        AnalysisRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(format!(
                    "Diagnostic Report:\n---\n{}\n---\n\nFollow-up Question: {}",
                    report, question
                ))],
            }],
            system_instruction: SystemInstruction::text(self.config.system_prompt.clone()),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        }
    }

    /// Ask a question about a report, retrying with backoff
    ///
    /// A 429, a non-success status, a transport error, or a response with no
    /// extractable text each consume one attempt. Backoff follows every
    /// failed attempt except the last.
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::RetriesExhausted` once every attempt has failed
    pub async fn ask_about_report(&self, report: &str, question: &str) -> Result<String> {
        let request = self.build_request(report, question);

        for attempt in 0..self.policy.max_attempts {
            match self.attempt(&request).await {
                Ok(Some(answer)) => {
                    tracing::info!("Legacy answer received on attempt {}", attempt + 1);
                    return Ok(answer);
                }
                Ok(None) => {
                    tracing::warn!("Attempt {}: response carried no answer text", attempt + 1);
                }
                Err(e) => {
                    tracing::warn!("Attempt {} failed: {}", attempt + 1, e);
                }
            }

            if !self.policy.is_last(attempt) {
                let delay = self.policy.delay_for(attempt);
                tracing::debug!("Backing off {:?} before next attempt", delay);
                self.sleeper.sleep(delay).await;
            }
        }

        tracing::error!(
            "Legacy question failed after {} attempts",
            self.policy.max_attempts
        );
        Err(MedraxError::RetriesExhausted {
            attempts: self.policy.max_attempts,
        }
        .into())
    }

    async fn attempt(&self, request: &AnalysisRequest) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(MedraxError::Http)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MedraxError::RateLimited.into());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedraxError::Backend {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        let body: serde_json::Value = response.json().await.map_err(MedraxError::Http)?;
        Ok(CandidatesResponse::from_json(body)
            .first_text()
            .map(str::to_string))
    }
}

#[async_trait]
impl FollowUpService for LegacyAskClient {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn requires_session(&self) -> bool {
        false
    }

    async fn ask(&self, ctx: FollowUpContext<'_>, question: &str) -> Result<Option<String>> {
        let report = ctx
            .report
            .ok_or_else(|| MedraxError::FollowUpRefused("no report to ask about".to_string()))?;
        self.ask_about_report(report, question).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LegacyAskClient {
        LegacyAskClient::new(&BackendConfig::default(), FollowUpConfig::default()).unwrap()
    }

    #[test]
    fn test_build_request_embeds_report_and_question() {
        let request = client().build_request("Impression: normal.", "Is it normal?");
        let content = &request.contents[0];
        assert!(content.role.is_none());
        assert_eq!(
            content.parts[0],
            Part::text(
                "Diagnostic Report:\n---\nImpression: normal.\n---\n\nFollow-up Question: Is it normal?"
            )
        );
        match &request.system_instruction.parts[0] {
            Part::Text { text } => assert!(text.starts_with("You are a helpful, concise")),
            other => panic!("Expected text part, got {:?}", other),
        }
    }

    #[test]
    fn test_default_policy_from_config() {
        let client = client();
        assert_eq!(client.policy(), RetryPolicy::default());
        assert!(!client.requires_session());
    }
}
