//! MedRAX - X-ray report generation client
//!
#![doc = "Main entry point for the MedRAX command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medrax::cli::{Cli, Commands};
use medrax::commands;
use medrax::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Login { id } => {
            tracing::info!("Starting sign-in");
            commands::login::run_login(config, id).await?;
            Ok(())
        }
        Commands::Analyze { image, json } => {
            tracing::info!("Starting report generation");
            tracing::debug!("Image path: {}", image.display());
            commands::analyze::run_analyze(config, &image, json).await?;
            Ok(())
        }
        Commands::Ask {
            history_id,
            question,
        } => {
            tracing::info!("Starting follow-up question");
            commands::ask::run_ask(config, history_id, question).await?;
            Ok(())
        }
        Commands::AskReport { report, question } => {
            tracing::info!("Starting legacy follow-up question");
            tracing::debug!("Report path: {}", report.display());
            commands::ask::run_ask_report(config, &report, question).await?;
            Ok(())
        }
        Commands::Chat {
            image,
            user,
            legacy,
        } => {
            if legacy {
                tracing::debug!("Using legacy follow-up endpoint");
            }
            commands::chat::run_chat(config, &image, user, legacy).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "medrax=debug" } else { "medrax=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
