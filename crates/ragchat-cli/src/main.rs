use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragchat_cli::config::{Config, LogFormat, LoggingConfig};
use ragchat_cli::Repl;
use ragchat_client::RagClient;
use ragchat_ui::Shell;

/// Terminal client for a RAG chat backend
#[derive(Parser)]
#[command(name = "ragchat", version, about)]
struct Cli {
    /// Extra TOML configuration file, applied over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000/api
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging);

    let client = RagClient::new(config.client_config()).context("Failed to create API client")?;
    tracing::info!(base_url = %client.base_url(), "Starting RAG chat client");

    let shell = Shell::new(Arc::new(client), config.poll_intervals());

    let mut repl = Repl::new(shell, std::io::stdout());
    repl.run(BufReader::new(tokio::io::stdin()))
        .await
        .context("Terminal I/O failed")?;

    Ok(())
}

/// Logs go to stderr so they never interleave with the transcript
fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
