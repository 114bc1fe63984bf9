//! Command-line interface definition for MedRAX
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for sign-in, report generation, and follow-up
//! questions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MedRAX - X-ray report generation client
///
/// Upload an X-ray image to the analysis backend, read the generated
/// diagnostic report, and ask follow-up questions about it.
#[derive(Parser, Debug, Clone)]
#[command(name = "medrax")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the analysis backend base URL
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for MedRAX
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in to the dashboard
    Login {
        /// Email or mobile number
        #[arg(short, long)]
        id: String,
    },

    /// Generate a diagnostic report for an image
    Analyze {
        /// Path to the X-ray image
        image: PathBuf,

        /// Print the report and history id as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a follow-up question about an existing report session
    Ask {
        /// Session identifier returned by `analyze`
        #[arg(long)]
        history_id: String,

        /// The question to ask
        question: String,
    },

    /// Ask about a saved report via the legacy endpoint (retries on failure)
    AskReport {
        /// File containing the report text
        #[arg(short, long)]
        report: PathBuf,

        /// The question to ask
        question: String,
    },

    /// Sign in, analyze an image, then ask questions interactively
    Chat {
        /// Path to the X-ray image
        image: PathBuf,

        /// Sign in as this user instead of prompting
        #[arg(short, long)]
        user: Option<String>,

        /// Ask through the legacy report-embedded endpoint
        #[arg(long)]
        legacy: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_analyze() {
        let cli = Cli::try_parse_from(["medrax", "analyze", "xray1.png"]).unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        if let Commands::Analyze { image, json } = cli.command {
            assert_eq!(image, PathBuf::from("xray1.png"));
            assert!(!json);
        } else {
            panic!("Expected Analyze command");
        }
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::try_parse_from([
            "medrax",
            "ask",
            "--history-id",
            "abc123",
            "What is the impression?",
        ])
        .unwrap();
        if let Commands::Ask {
            history_id,
            question,
        } = cli.command
        {
            assert_eq!(history_id, "abc123");
            assert_eq!(question, "What is the impression?");
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_ask_report() {
        let cli =
            Cli::try_parse_from(["medrax", "ask-report", "-r", "report.txt", "Is it normal?"])
                .unwrap();
        assert!(matches!(cli.command, Commands::AskReport { .. }));
    }

    #[test]
    fn test_cli_parse_chat_with_options() {
        let cli = Cli::try_parse_from([
            "medrax",
            "--backend-url",
            "http://localhost:9000",
            "chat",
            "scan.jpg",
            "--user",
            "doctor@example.com",
            "--legacy",
        ])
        .unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://localhost:9000"));
        if let Commands::Chat {
            image,
            user,
            legacy,
        } = cli.command
        {
            assert_eq!(image, PathBuf::from("scan.jpg"));
            assert_eq!(user.as_deref(), Some("doctor@example.com"));
            assert!(legacy);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_login_requires_id() {
        assert!(Cli::try_parse_from(["medrax", "login"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["medrax"]).is_err());
    }
}
