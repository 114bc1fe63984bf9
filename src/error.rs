//! Error types for MedRAX
//!
//! This module defines the error taxonomy used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for MedRAX operations
///
/// Every failure is contained to the request that produced it. None of
/// these variants is fatal to the application; the session layer turns
/// them into user-visible messages and leaves prior state intact.
#[derive(Error, Debug)]
pub enum MedraxError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The image file could not be read
    #[error("Failed to read file {path}: {message}")]
    FileRead {
        /// Path that was being read
        path: String,
        /// Underlying failure
        message: String,
    },

    /// The selected file is not an image
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Transfer encoding could not be reversed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The backend answered with a non-success status
    #[error("Backend returned error {status}: {message}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The backend asked us to slow down (HTTP 429)
    #[error("Rate limited by backend")]
    RateLimited,

    /// Every allowed attempt of a retrying request failed
    #[error("Request failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts performed
        attempts: u32,
    },

    /// A follow-up question was refused before any network call
    #[error("Follow-up refused: {0}")]
    FollowUpRefused(String),

    /// Sign-in failed
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed URL in configuration
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for MedRAX operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Use
/// `downcast_ref::<MedraxError>()` to branch on a specific variant.
pub type Result<T> = anyhow::Result<T>;
