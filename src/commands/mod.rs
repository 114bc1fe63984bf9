/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `login`   - Simulated sign-in
- `analyze` - One-shot report generation
- `ask`     - One-shot follow-up questions (primary and legacy endpoints)
- `chat`    - Sign-in, report, then an interactive follow-up loop

The handlers are thin: every flow goes through [`crate::session::Session`]
so the CLI behaves exactly like any other front end over the library.
*/

use crate::auth::{Authenticator, Credentials, SimulatedAuthenticator};
use crate::backend::{BackendClient, LegacyAskClient};
use crate::config::Config;
use crate::error::{MedraxError, Result};
use crate::session::{FollowUpExchange, Notice, ReportState, Session};
use crate::upload::UploadedImage;
use colored::Colorize;
use std::path::Path;

// Slash-command parser for the chat loop
pub mod special_commands;

/// Print the report panel for a session
fn print_report(session: &Session) {
    println!("\n{}", "AI-Generated Report".bold());
    println!("{}", "─".repeat(60));
    match session.report() {
        ReportState::Generated(text) => println!("{}", text),
        ReportState::Failed => println!("{}", session.display_report().red()),
        _ => println!("{}", session.display_report().yellow()),
    }
    println!("{}", "─".repeat(60));
    if let Some(history_id) = session.history_id() {
        println!("History ID: {}\n", history_id.cyan());
    }
}

fn print_exchange(exchange: &FollowUpExchange) {
    println!("\n{} {}", "Q:".bold(), exchange.question);
    println!("{} {}\n", "A:".bold().green(), exchange.answer);
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Blocking(message) => eprintln!("{}", message.yellow()),
        Notice::Failure(message) => eprintln!("{}", message.red()),
    }
}

/// Ask the session's pending question and print the outcome
async fn ask_and_print(
    session: &mut Session,
    service: &dyn crate::backend::FollowUpService,
) -> Result<()> {
    if session.followup_ready(service) {
        println!("{}", "Thinking...".dimmed());
    }
    let outcome = session.ask_followup(service).await.map(|e| e.clone());
    match outcome {
        Ok(exchange) => {
            print_exchange(&exchange);
            Ok(())
        }
        Err(e) => {
            if let Some(notice) = session.take_notice() {
                print_notice(&notice);
            }
            Err(e)
        }
    }
}

// Login command handler
pub mod login {
    //! Simulated sign-in handler.

    use super::*;

    /// Sign in with the configured authenticator and print the identity
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is blank
    pub async fn run_login(config: Config, id: String) -> Result<()> {
        let authenticator = SimulatedAuthenticator::from(&config.auth);
        println!("{}", "Signing in...".dimmed());
        let identity = authenticator.sign_in(&Credentials::new(id)).await?;
        println!(
            "{} {} (session {})",
            "Signed in as".green(),
            identity.id.bold(),
            identity.token
        );
        Ok(())
    }
}

// Analyze command handler
pub mod analyze {
    //! One-shot report generation.

    use super::*;

    /// Upload an image and print the generated report
    ///
    /// # Errors
    ///
    /// Returns error if the image cannot be loaded or the report request failed
    pub async fn run_analyze(config: Config, image_path: &Path, json: bool) -> Result<()> {
        let client = BackendClient::new(config.backend, config.analysis)?;
        let image = UploadedImage::from_path(image_path).await?;

        let mut session = Session::new();
        if !json {
            println!("{}", format!("Generating report for {}...", image.file_name()).cyan());
        }
        session.upload_image(&client, image).await;

        if json {
            let output = serde_json::json!({
                "report": session.report().text(),
                "message": session.display_report(),
                "history_id": session.history_id(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_report(&session);
        }

        if matches!(session.report(), ReportState::Failed) {
            anyhow::bail!("Report generation failed for {}", image_path.display());
        }
        Ok(())
    }
}

// Ask command handlers
pub mod ask {
    //! One-shot follow-up questions.

    use super::*;

    /// Ask the primary backend about an existing report session
    ///
    /// # Errors
    ///
    /// Returns error if the question is blank or the request fails
    pub async fn run_ask(config: Config, history_id: String, question: String) -> Result<()> {
        let client = BackendClient::new(config.backend, config.analysis)?;
        // Report text lives on the backend; only the session id is needed here.
        let mut session = Session::resume(String::new(), Some(history_id));
        session.set_question(question);
        ask_and_print(&mut session, &client).await
    }

    /// Ask the legacy endpoint about a report saved to disk
    ///
    /// # Errors
    ///
    /// Returns error if the report file cannot be read or the question is blank
    pub async fn run_ask_report(config: Config, report_path: &Path, question: String) -> Result<()> {
        let report = tokio::fs::read_to_string(report_path)
            .await
            .map_err(|e| MedraxError::FileRead {
                path: report_path.display().to_string(),
                message: e.to_string(),
            })?;

        let client = LegacyAskClient::new(&config.backend, config.followup)?;
        let mut session = Session::resume(report, None);
        session.set_question(question);
        ask_and_print(&mut session, &client).await
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Signs the user in, generates the report for the given image, then runs
    //! a readline loop where each line is a follow-up question or a slash
    //! command.

    use super::special_commands::{parse_chat_command, print_help, ChatCommand};
    use super::*;
    use crate::backend::FollowUpService;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `image_path` - Image to analyze first
    /// * `user` - Sign in as this user instead of prompting
    /// * `legacy` - Route questions to the legacy retrying endpoint
    pub async fn run_chat(
        config: Config,
        image_path: &Path,
        user: Option<String>,
        legacy: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut rl = DefaultEditor::new()?;

        let authenticator = SimulatedAuthenticator::from(&config.auth);
        let identity = sign_in(&mut rl, &authenticator, user).await?;

        let client = BackendClient::new(config.backend.clone(), config.analysis.clone())?;
        let legacy_client = if legacy {
            Some(LegacyAskClient::new(&config.backend, config.followup.clone())?)
        } else {
            None
        };
        let service: &dyn FollowUpService = match &legacy_client {
            Some(legacy_client) => legacy_client,
            None => &client,
        };

        print_welcome_banner(&identity.id, service.name());

        let mut session = Session::new();
        analyze_into(&mut session, &client, image_path).await?;

        loop {
            match rl.readline("medrax> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_chat_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().yellow());
                            continue;
                        }
                    };

                    match command {
                        ChatCommand::Help => print_help(),
                        ChatCommand::Report => print_report(&session),
                        ChatCommand::History => print_history(&session),
                        ChatCommand::Status => print_status(&session, service.name()),
                        ChatCommand::NewDiagnosis(path) => {
                            if let Err(e) = analyze_into(&mut session, &client, &path).await {
                                eprintln!("{}", format!("Error: {}", e).red());
                            }
                        }
                        ChatCommand::Exit => break,
                        ChatCommand::Question(question) => {
                            session.set_question(question);
                            // Failures are already surfaced as notices
                            if let Err(e) = ask_and_print(&mut session, service).await {
                                tracing::debug!("Follow-up failed: {:#}", e);
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Sign in, prompting until a non-blank identifier is accepted
    async fn sign_in(
        rl: &mut DefaultEditor,
        authenticator: &dyn Authenticator,
        user: Option<String>,
    ) -> Result<crate::auth::Identity> {
        if let Some(user) = user {
            return authenticator.sign_in(&Credentials::new(user)).await;
        }

        println!("{}", "Sign in to continue".bold());
        loop {
            let id = rl.readline("Email or mobile number: ")?;
            println!("{}", "Signing in...".dimmed());
            match authenticator.sign_in(&Credentials::new(id)).await {
                Ok(identity) => return Ok(identity),
                Err(e) => eprintln!("{}", e.to_string().yellow()),
            }
        }
    }

    /// Load an image and run the report flow into the session
    async fn analyze_into(
        session: &mut Session,
        client: &BackendClient,
        image_path: &Path,
    ) -> Result<()> {
        let image = UploadedImage::from_path(image_path).await?;
        println!(
            "{}",
            format!("Generating report for {}...", image.file_name()).cyan()
        );
        session.upload_image(client, image).await;
        print_report(session);
        Ok(())
    }

    fn print_welcome_banner(user: &str, service: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              MedRAX AI - X-Ray Report Assistant              ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Signed in as {} (follow-ups via {} endpoint)", user.bold(), service);
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_history(session: &Session) {
        if session.history().is_empty() {
            println!("No questions asked yet.\n");
            return;
        }
        for exchange in session.history() {
            print_exchange(exchange);
        }
    }

    fn print_status(session: &Session, service: &str) {
        println!("\n{}", "Session Status".bold());
        println!(
            "  Image:      {}",
            session
                .image()
                .map(|i| format!("{} ({}, {} bytes)", i.file_name(), i.media_type(), i.len()))
                .unwrap_or_else(|| "none".to_string())
        );
        println!(
            "  Report:     {}",
            match session.report() {
                ReportState::Empty => "none",
                ReportState::Generated(_) => "generated",
                ReportState::Missing => "empty response",
                ReportState::Failed => "failed",
            }
        );
        println!(
            "  History ID: {}",
            session.history_id().unwrap_or("none")
        );
        println!("  Follow-ups: {} via {}\n", session.history().len(), service);
    }
}
