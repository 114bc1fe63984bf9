//! Diagnosis session state
//!
//! [`Session`] holds everything the front end displays: the selected image,
//! the report, the backend session identifier, the loading flag, the pending
//! question and the Q&A history. Each flow is a state transition over this
//! struct plus one network effect. Failures are contained: they become a
//! user-visible message and never corrupt prior state.

use crate::backend::{BackendClient, FollowUpContext, FollowUpService};
use crate::error::{MedraxError, Result};
use crate::upload::UploadedImage;
use serde::{Deserialize, Serialize};

/// Shown when the backend returned no report text
pub const NO_REPORT_MESSAGE: &str = "No report generated. Try again.";
/// Shown when the report request failed
pub const REPORT_ERROR_MESSAGE: &str =
    "Error generating report. Please check your API key or try another image.";
/// Shown before any image has been analyzed
pub const EMPTY_REPORT_PLACEHOLDER: &str = "No report generated yet. Upload an image to begin.";
/// Blocking prompt for a follow-up asked too early
pub const FOLLOWUP_PRECONDITION_MESSAGE: &str =
    "Please generate report first and enter a question";
/// Notice for a follow-up that failed in transit
pub const FOLLOWUP_FAILURE_MESSAGE: &str = "Failed to get answer. Try again.";
/// Answer recorded when the retrying flow gives up
pub const RETRY_EXHAUSTED_ANSWER: &str = "Error: Unable to get an answer.";
/// Answer recorded when the backend replied without an answer
pub const NO_ANSWER_MESSAGE: &str = "No answer returned.";

/// Outcome of the most recent report request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportState {
    /// Nothing analyzed yet
    #[default]
    Empty,
    /// Backend returned report text
    Generated(String),
    /// Backend answered without report text
    Missing,
    /// Request or response parsing failed
    Failed,
}

impl ReportState {
    /// Text to display for this state
    pub fn display_text(&self) -> &str {
        match self {
            ReportState::Empty => EMPTY_REPORT_PLACEHOLDER,
            ReportState::Generated(text) => text,
            ReportState::Missing => NO_REPORT_MESSAGE,
            ReportState::Failed => REPORT_ERROR_MESSAGE,
        }
    }

    /// Whether the backend answered the report request
    pub fn is_received(&self) -> bool {
        matches!(self, ReportState::Generated(_) | ReportState::Missing)
    }

    /// Generated report text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            ReportState::Generated(text) => Some(text),
            _ => None,
        }
    }
}

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpExchange {
    /// The question as asked
    pub question: String,
    /// The answer shown to the user
    pub answer: String,
}

/// A message the front end must surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The user must act before continuing
    Blocking(String),
    /// A request failed; prior state is unchanged
    Failure(String),
}

impl Notice {
    /// Message text
    pub fn message(&self) -> &str {
        match self {
            Notice::Blocking(message) | Notice::Failure(message) => message,
        }
    }
}

/// Application state for one diagnosis workflow
#[derive(Debug, Default)]
pub struct Session {
    image: Option<UploadedImage>,
    report: ReportState,
    history_id: Option<String>,
    loading: bool,
    question: String,
    history: Vec<FollowUpExchange>,
    notice: Option<Notice>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a session from a report generated earlier
    ///
    /// No image is attached; only follow-up questions are possible.
    pub fn resume(report: impl Into<String>, history_id: Option<String>) -> Self {
        Self {
            report: ReportState::Generated(report.into()),
            history_id: history_id.filter(|id| !id.is_empty()),
            ..Self::default()
        }
    }

    /// Currently selected image
    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    /// Outcome of the last report request
    pub fn report(&self) -> &ReportState {
        &self.report
    }

    /// Text to show in the report panel
    pub fn display_report(&self) -> &str {
        self.report.display_text()
    }

    /// Active session identifier
    pub fn history_id(&self) -> Option<&str> {
        self.history_id.as_deref()
    }

    /// Whether a report request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Pending question text
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Q&A exchanges in the order they were asked
    pub fn history(&self) -> &[FollowUpExchange] {
        &self.history
    }

    /// Most recent notice, if any
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Take the pending notice, clearing it
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Replace the pending question text
    pub fn set_question(&mut self, question: impl Into<String>) {
        self.question = question.into();
    }

    /// Discard the image, report, session identifier and history
    pub fn new_diagnosis(&mut self) {
        tracing::info!("Starting new diagnosis");
        self.image = None;
        self.report = ReportState::Empty;
        self.history_id = None;
        self.question.clear();
        self.history.clear();
        self.notice = None;
    }

    /// Analyze a newly selected image
    ///
    /// Selecting an image starts a new session: the previous report, session
    /// identifier and history are discarded before the request is sent. The
    /// request is attempted once. Any failure is recorded as
    /// [`ReportState::Failed`] rather than returned.
    ///
    /// The reset on selection takes precedence over keeping the identifier
    /// on failure: a failed report leaves no session identifier behind.
    ///
    /// The loading flag is cleared on every exit, including when the
    /// returned future is dropped before completion.
    pub async fn upload_image(&mut self, client: &BackendClient, image: UploadedImage) {
        self.new_diagnosis();
        let _loading = LoadingGuard::raise(&mut self.loading);

        let image = self.image.insert(image);
        let result = client.analyze(image).await;

        match result {
            Ok(response) => {
                self.report = match response.text {
                    Some(text) => ReportState::Generated(text),
                    None => {
                        tracing::warn!("Backend returned no report text");
                        ReportState::Missing
                    }
                };
                if let Some(history_id) = response.history_id {
                    tracing::info!("History ID stored: {}", history_id);
                    self.history_id = Some(history_id);
                }
            }
            Err(e) => {
                tracing::error!("Error while generating report: {:#}", e);
                self.report = ReportState::Failed;
            }
        }
    }

    /// Ask the pending question through the given follow-up service
    ///
    /// On success the exchange is appended to the history and the question
    /// is cleared. When the retrying flow gives up, its fixed error answer is
    /// recorded as the exchange's answer.
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::FollowUpRefused` without any network call when
    /// the question is blank, no report has been received, or the service
    /// needs a session identifier that does not exist. Returns the
    /// underlying error for any other failure; history is left untouched.
    pub async fn ask_followup(
        &mut self,
        service: &dyn FollowUpService,
    ) -> Result<&FollowUpExchange> {
        self.notice = None;

        if let Err(reason) = self.check_followup_ready(service) {
            tracing::warn!("Follow-up refused: {}", reason);
            self.notice = Some(Notice::Blocking(FOLLOWUP_PRECONDITION_MESSAGE.to_string()));
            return Err(MedraxError::FollowUpRefused(reason).into());
        }

        let question = self.question.trim().to_string();
        let ctx = FollowUpContext {
            report: self.report.text(),
            history_id: self.history_id.as_deref(),
        };

        tracing::debug!("Asking follow-up via {} service", service.name());
        let result = service.ask(ctx, &question).await;
        let answer = match result {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                tracing::warn!("Follow-up response carried no answer");
                NO_ANSWER_MESSAGE.to_string()
            }
            Err(e)
                if matches!(
                    e.downcast_ref::<MedraxError>(),
                    Some(MedraxError::RetriesExhausted { .. })
                ) =>
            {
                RETRY_EXHAUSTED_ANSWER.to_string()
            }
            Err(e) => {
                tracing::error!("Error asking follow-up question: {:#}", e);
                self.notice = Some(Notice::Failure(FOLLOWUP_FAILURE_MESSAGE.to_string()));
                return Err(e);
            }
        };

        self.history.push(FollowUpExchange { question, answer });
        self.question.clear();

        let exchange = self
            .history
            .last()
            .ok_or_else(|| MedraxError::FollowUpRefused("history is empty".to_string()))?;
        Ok(exchange)
    }

    /// Whether [`Session::ask_followup`] would reach the service
    pub fn followup_ready(&self, service: &dyn FollowUpService) -> bool {
        self.check_followup_ready(service).is_ok()
    }

    fn check_followup_ready(
        &self,
        service: &dyn FollowUpService,
    ) -> std::result::Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question is empty".to_string());
        }
        if service.requires_session() {
            let has_session = self.history_id.as_deref().is_some_and(|id| !id.is_empty());
            if !self.report.is_received() || !has_session {
                return Err("no active report session".to_string());
            }
        } else if self.report.text().is_none() {
            return Err("no report text".to_string());
        }
        Ok(())
    }
}

/// Holds the loading flag up until dropped
struct LoadingGuard<'a>(&'a mut bool);

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
