//! Configuration management for MedRAX
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MedraxError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for MedRAX
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis backend endpoints
    #[serde(default)]
    pub backend: BackendConfig,

    /// Report generation request settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Follow-up question settings
    #[serde(default)]
    pub followup: FollowUpConfig,

    /// Sign-in gate settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL hosting `/analyze-image-json` and `/ask-followup`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Full URL of the legacy report-embedded question endpoint
    #[serde(default = "default_legacy_ask_url")]
    pub legacy_ask_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_legacy_ask_url() -> String {
    "https://medrax-backend.onrender.com/ask/".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            legacy_ask_url: default_legacy_ask_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl BackendConfig {
    /// Join an endpoint path onto the base URL without doubling slashes
    ///
    /// # Examples
    ///
    /// ```
    /// use medrax::config::BackendConfig;
    ///
    /// let config = BackendConfig {
    ///     base_url: "http://localhost:8000/".to_string(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(
    ///     config.endpoint("/ask-followup"),
    ///     "http://localhost:8000/ask-followup"
    /// );
    /// ```
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Report generation request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// System instruction sent with every analysis request
    #[serde(default = "default_analysis_system_prompt")]
    pub system_prompt: String,

    /// User text accompanying the inline image
    #[serde(default = "default_analysis_user_prompt")]
    pub user_prompt: String,

    /// Generation temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_analysis_system_prompt() -> String {
    "You are a professional AI Medical Diagnostic Assistant. Analyze the provided X-ray and \
     produce structured sections: Findings, Impression, and Recommendations."
        .to_string()
}

fn default_analysis_user_prompt() -> String {
    "Analyze this X-ray medical image and provide the report.".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_analysis_system_prompt(),
            user_prompt: default_analysis_user_prompt(),
            temperature: default_temperature(),
        }
    }
}

/// Follow-up question configuration
///
/// The retry settings apply to the legacy endpoint only; the primary
/// session-based endpoint is always a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpConfig {
    /// System instruction for the legacy report-embedded question
    #[serde(default = "default_followup_system_prompt")]
    pub system_prompt: String,

    /// Generation temperature for the legacy endpoint
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum attempts against the legacy endpoint
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay; doubles with each attempt (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_followup_system_prompt() -> String {
    "You are a helpful, concise AI medical assistant. You will be given a diagnostic report \
     and a follow-up question. Answer strictly based on the report content."
        .to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_followup_system_prompt(),
            temperature: default_temperature(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Sign-in gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Delay before the simulated sign-in succeeds (milliseconds)
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
}

fn default_simulated_delay_ms() -> u64 {
    1200
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            simulated_delay_ms: default_simulated_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. Environment variables are applied on top of the file, then
    /// CLI overrides on top of both.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| MedraxError::Config(format!("Failed to parse {}: {}", path, e)))?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("MEDRAX_BACKEND_URL") {
            tracing::debug!(base_url = %base_url, "Env override: MEDRAX_BACKEND_URL");
            self.backend.base_url = base_url;
        }

        if let Ok(legacy_url) = std::env::var("MEDRAX_LEGACY_ASK_URL") {
            tracing::debug!(legacy_url = %legacy_url, "Env override: MEDRAX_LEGACY_ASK_URL");
            self.backend.legacy_ask_url = legacy_url;
        }

        if let Ok(timeout) = std::env::var("MEDRAX_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MEDRAX_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(attempts) = std::env::var("MEDRAX_MAX_ATTEMPTS") {
            if let Ok(value) = attempts.parse() {
                self.followup.max_attempts = value;
            } else {
                tracing::warn!("Invalid MEDRAX_MAX_ATTEMPTS: {}", attempts);
            }
        }

        if let Ok(delay) = std::env::var("MEDRAX_BASE_DELAY_MS") {
            if let Ok(value) = delay.parse() {
                self.followup.base_delay_ms = value;
            } else {
                tracing::warn!("Invalid MEDRAX_BASE_DELAY_MS: {}", delay);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.backend_url {
            tracing::debug!("CLI override: backend url {}", base_url);
            self.backend.base_url = base_url.clone();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        validate_http_url("backend.base_url", &self.backend.base_url)?;
        validate_http_url("backend.legacy_ask_url", &self.backend.legacy_ask_url)?;

        if self.backend.timeout_seconds == 0 {
            return Err(MedraxError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        for (field, value) in [
            ("analysis.temperature", self.analysis.temperature),
            ("followup.temperature", self.followup.temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(MedraxError::Config(format!(
                    "{} must be between 0.0 and 2.0",
                    field
                ))
                .into());
            }
        }

        if self.followup.max_attempts == 0 || self.followup.max_attempts > 10 {
            return Err(MedraxError::Config(
                "followup.max_attempts must be between 1 and 10".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MedraxError::Config(format!("{} cannot be empty", field)).into());
    }

    let parsed = url::Url::parse(value)
        .map_err(|e| MedraxError::Config(format!("{} is not a valid URL: {}", field, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(MedraxError::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))
        .into()),
    }
}
