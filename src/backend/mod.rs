//! Analysis backend access
//!
//! This module contains the wire types, the primary backend client, the
//! legacy retrying question client, and the [`FollowUpService`] seam that
//! lets the session drive either follow-up flow through one interface.

pub mod client;
pub mod legacy;
pub mod retry;
pub mod types;

pub use client::BackendClient;
pub use legacy::LegacyAskClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::{
    AnalysisRequest, AnalysisResponse, CandidatesResponse, Content, GenerationConfig, InlineData,
    Part, SystemInstruction,
};

use crate::error::Result;
use async_trait::async_trait;

/// What a follow-up flow may draw on from the current session
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpContext<'a> {
    /// Generated report text, if any
    pub report: Option<&'a str>,
    /// Session identifier returned with the report, if any
    pub history_id: Option<&'a str>,
}

/// A capability that answers a question about the current report
///
/// Implementations differ in endpoint, request shape, response schema, and
/// retry behavior. `Ok(None)` means the backend answered without usable text.
#[async_trait]
pub trait FollowUpService: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether a session identifier must exist before asking
    fn requires_session(&self) -> bool;

    /// Ask the question
    async fn ask(&self, ctx: FollowUpContext<'_>, question: &str) -> Result<Option<String>>;
}
