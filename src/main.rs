use anyhow::Result;
use clap::{Parser, Subcommand};
use keepsake::{cli, config, server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keepsake", version, about = "Voice-agent memory server - facts, memories, and semantic recall")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio or http transport per config)
    Serve,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Show store statistics
    Stats {
        /// Restrict counts to one user
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete all data for one user (memories, entities, vectors)
    ResetUser {
        /// User ID to reset
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.keepsake/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::KeepsakeConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => match config.server.transport.as_str() {
            "http" => server::serve_http(config).await?,
            _ => server::serve_stdio(config).await?,
        },
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
        Command::Stats { user } => {
            cli::stats::stats(&config, user.as_deref())?;
        }
        Command::ResetUser { user } => {
            cli::reset::reset_user(&config, &user).await?;
        }
    }

    Ok(())
}
