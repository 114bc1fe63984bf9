//! Wire types for the analysis backend
//!
//! Requests are strongly typed and serialize to the camelCase shape the
//! backend forwards to the generative model. Responses are read leniently
//! from a `serde_json::Value`: a missing or mistyped field means "no data"
//! rather than a hard failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A role-tagged generation request with one or more parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Conversation contents; a single user turn in practice
    pub contents: Vec<Content>,
    /// Instruction applied to the whole request
    pub system_instruction: SystemInstruction,
    /// Numeric generation parameters
    pub generation_config: GenerationConfig,
}

/// One turn of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Role of the author; omitted for the legacy question payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text and attachment parts
    pub parts: Vec<Part>,
}

/// A free-text part or an inline binary attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Free text
    Text {
        /// The text itself
        text: String,
    },
    /// Base64 payload with its media type
    InlineData {
        /// Attachment body
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    /// Build a text part
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Build an inline attachment part
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Inline attachment body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// Declared media type
    pub mime_type: String,
    /// Base64 payload without any data-URL prefix
    pub data: String,
}

/// System instruction wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInstruction {
    /// Instruction parts
    pub parts: Vec<Part>,
}

impl SystemInstruction {
    /// Instruction made of a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature
    pub temperature: f32,
}

/// Body of `POST /analyze-image-json`
#[derive(Debug, Serialize)]
pub struct AnalyzeEnvelope<'a> {
    /// The generation request
    pub payload: &'a AnalysisRequest,
}

/// Result of an analysis request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResponse {
    /// Generated report text
    pub text: Option<String>,
    /// Session identifier for follow-up questions
    pub history_id: Option<String>,
}

impl AnalysisResponse {
    /// Extract `text` and `history_id` from a response body
    ///
    /// # Examples
    ///
    /// ```
    /// use medrax::backend::AnalysisResponse;
    /// use serde_json::json;
    ///
    /// let response = AnalysisResponse::from_json(&json!({"text": "Findings", "history_id": 7}));
    /// assert_eq!(response.text.as_deref(), Some("Findings"));
    /// assert_eq!(response.history_id, None);
    /// ```
    pub fn from_json(body: &Value) -> Self {
        Self {
            text: string_field(body, "text"),
            history_id: string_field(body, "history_id"),
        }
    }
}

/// Body of `POST /ask-followup`
#[derive(Debug, Serialize)]
pub struct FollowUpRequest<'a> {
    /// Session identifier from the analysis response
    pub history_id: &'a str,
    /// The user's question
    pub question: &'a str,
}

/// Extract `answer` from a follow-up response body
pub fn followup_answer(body: &Value) -> Option<String> {
    string_field(body, "answer")
}

/// External-service response schema used by the legacy ask endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatesResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One generated candidate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// Candidate content, absent when generation was blocked
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

/// Content of a candidate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    /// Returned parts
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

/// A returned part; non-text parts carry no `text`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatePart {
    /// Text, if any
    #[serde(default)]
    pub text: Option<String>,
}

impl CandidatesResponse {
    /// Parse leniently; an unexpected shape yields no candidates
    pub fn from_json(body: Value) -> Self {
        serde_json::from_value(body).unwrap_or_default()
    }

    /// Text of the first part of the first candidate, if non-empty
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

/// A string field, treating an empty string as absent
fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
