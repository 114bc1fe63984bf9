//! MedRAX - X-ray report generation client library
//!
//! This library uploads a medical X-ray image to a remote analysis backend,
//! keeps the generated diagnostic report and its session identifier, and
//! answers follow-up questions about that report.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `upload`: Selected images and media-type detection
//! - `encoding`: Base64 transfer encoding and data URLs
//! - `backend`: Wire types, the primary client, and the retrying legacy client
//! - `session`: Application state and the report/follow-up flows
//! - `auth`: Pluggable sign-in gate
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line front end
//!
//! # Example
//!
//! ```no_run
//! use medrax::{BackendClient, Config, Session, UploadedImage};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let client = BackendClient::new(config.backend, config.analysis)?;
//!     let mut session = Session::new();
//!     let image = UploadedImage::from_path(Path::new("xray1.png")).await?;
//!     session.upload_image(&client, image).await;
//!
//!     session.set_question("What is the impression?");
//!     let exchange = session.ask_followup(&client).await?;
//!     println!("{}", exchange.answer);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod encoding;
pub mod error;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use auth::{Authenticator, Credentials, Identity, SimulatedAuthenticator};
pub use backend::{BackendClient, FollowUpService, LegacyAskClient, RetryPolicy};
pub use config::Config;
pub use error::{MedraxError, Result};
pub use session::{FollowUpExchange, Notice, ReportState, Session};
pub use upload::UploadedImage;
