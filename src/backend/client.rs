//! Primary analysis backend client
//!
//! Both calls here are single attempts. Report generation is never retried;
//! only the legacy question endpoint in [`super::legacy`] backs off.

use crate::backend::types::{
    followup_answer, AnalysisRequest, AnalysisResponse, AnalyzeEnvelope, Content,
    FollowUpRequest, GenerationConfig, Part, SystemInstruction,
};
use crate::backend::{FollowUpContext, FollowUpService};
use crate::config::{AnalysisConfig, BackendConfig};
use crate::error::{MedraxError, Result};
use crate::upload::UploadedImage;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

const ANALYZE_PATH: &str = "analyze-image-json";
const FOLLOWUP_PATH: &str = "ask-followup";

/// Client for `/analyze-image-json` and `/ask-followup`
///
/// # Examples
///
/// ```no_run
/// use medrax::backend::BackendClient;
/// use medrax::config::Config;
/// use medrax::upload::UploadedImage;
/// use std::path::Path;
///
/// # async fn example() -> medrax::error::Result<()> {
/// let config = Config::default();
/// let client = BackendClient::new(config.backend, config.analysis)?;
/// let image = UploadedImage::from_path(Path::new("xray1.png")).await?;
/// let response = client.analyze(&image).await?;
/// println!("{:?}", response.text);
/// # Ok(())
/// # }
/// ```
pub struct BackendClient {
    client: Client,
    backend: BackendConfig,
    analysis: AnalysisConfig,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(backend: BackendConfig, analysis: AnalysisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(backend.timeout())
            .user_agent(concat!("medrax/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MedraxError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized backend client: base_url={}", backend.base_url);

        Ok(Self {
            client,
            backend,
            analysis,
        })
    }

    /// Configured backend base URL
    pub fn base_url(&self) -> &str {
        &self.backend.base_url
    }

    /// Build the generation request for an uploaded image
    ///
    /// One user turn carrying the instruction text and the inline image,
    /// plus the configured system instruction and temperature.
    pub fn build_analysis_request(&self, image: &UploadedImage) -> AnalysisRequest {
        AnalysisRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::text(self.analysis.user_prompt.clone()),
                    Part::inline(image.media_type(), image.encoded_payload()),
                ],
            }],
            system_instruction: SystemInstruction::text(self.analysis.system_prompt.clone()),
            generation_config: GenerationConfig {
                temperature: self.analysis.temperature,
            },
        }
    }

    /// Submit an image for report generation
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a body
    /// that is not JSON. Missing fields in a JSON body are not errors.
    pub async fn analyze(&self, image: &UploadedImage) -> Result<AnalysisResponse> {
        let request = self.build_analysis_request(image);
        let url = self.backend.endpoint(ANALYZE_PATH);

        tracing::info!(
            "Requesting report for {} ({}, {} bytes)",
            image.file_name(),
            image.media_type(),
            image.len()
        );

        let body = self
            .post_json(&url, &AnalyzeEnvelope { payload: &request })
            .await?;
        let response = AnalysisResponse::from_json(&body);

        tracing::debug!(
            has_text = response.text.is_some(),
            has_history_id = response.history_id.is_some(),
            "Analysis response received"
        );

        Ok(response)
    }

    /// Ask a question about the report identified by `history_id`
    ///
    /// Returns `Ok(None)` when the backend answers without an `answer` field.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a body
    /// that is not JSON
    pub async fn ask_followup(&self, history_id: &str, question: &str) -> Result<Option<String>> {
        let url = self.backend.endpoint(FOLLOWUP_PATH);
        tracing::info!("Asking follow-up question for history {}", history_id);

        let body = self
            .post_json(
                &url,
                &FollowUpRequest {
                    history_id,
                    question,
                },
            )
            .await?;

        Ok(followup_answer(&body))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            tracing::warn!("Request to {} failed: {}", url, e);
            MedraxError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Backend returned error {}: {}", status, error_text);
            return Err(MedraxError::Backend {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        let text = response.text().await.map_err(MedraxError::Http)?;
        let value = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to parse backend response from {}: {}", url, e);
            MedraxError::Serialization(e)
        })?;

        Ok(value)
    }
}

#[async_trait]
impl FollowUpService for BackendClient {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn requires_session(&self) -> bool {
        true
    }

    async fn ask(&self, ctx: FollowUpContext<'_>, question: &str) -> Result<Option<String>> {
        let history_id = ctx.history_id.ok_or_else(|| {
            MedraxError::FollowUpRefused("no active session identifier".to_string())
        })?;
        self.ask_followup(history_id, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BackendClient {
        BackendClient::new(BackendConfig::default(), AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_backend_client_creation() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(client.requires_session());
        assert_eq!(client.name(), "primary");
    }

    #[test]
    fn test_build_analysis_request_shape() {
        let image = UploadedImage::from_bytes(b"xray".to_vec(), "image/png", "xray1.png").unwrap();
        let request = client().build_analysis_request(&image);

        assert_eq!(request.contents.len(), 1);
        let content = &request.contents[0];
        assert_eq!(content.role.as_deref(), Some("user"));
        assert_eq!(content.parts.len(), 2);
        assert_eq!(
            content.parts[0],
            Part::text("Analyze this X-ray medical image and provide the report.")
        );
        assert_eq!(content.parts[1], Part::inline("image/png", "eHJheQ=="));
        assert_eq!(request.generation_config.temperature, 0.1);

        match &request.system_instruction.parts[0] {
            Part::Text { text } => assert!(text.contains("Findings, Impression, and Recommendations")),
            other => panic!("Expected text part, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ask_without_history_id_is_refused() {
        let ctx = FollowUpContext {
            report: Some("Findings"),
            history_id: None,
        };
        let err = client().ask(ctx, "Anything?").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MedraxError>(),
            Some(MedraxError::FollowUpRefused(_))
        ));
    }
}
