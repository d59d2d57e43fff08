//! palaver CLI: full-screen chat by default, plus one-shot history commands.
//!
//! Logging: written to `<data dir>/palaver.log`; set `RUST_LOG=palaver=debug` for more detail.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use palaver::commands;
use palaver::config::Config;
use palaver::llm::{CompletionClient, OpenAiClient};
use palaver::session::ChatSession;
use palaver::storage::HistoryStore;
use palaver::ui::App;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(version)]
#[command(about = "Chat with a hosted language model from your terminal", long_about = None)]
struct Cli {
    /// Config file (default: <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for chat history and logs (default: ~/.palaver)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the saved conversation
    History,
    /// Send one message and print the reply
    Ask { text: String },
    /// Delete the saved conversation
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn init_logging(config: &Config) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .with_context(|| format!("Failed to open log file {}", config.log_path().display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("palaver=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref(), cli.data_dir)?;
    init_logging(&config)?;

    match cli.command {
        None => {
            let store = HistoryStore::new(&config.data_dir);
            let session = ChatSession::load(store, config.has_api_key());
            let client = if config.has_api_key() {
                let client = OpenAiClient::from_config(&config)?;
                Some(Arc::new(client) as Arc<dyn CompletionClient>)
            } else {
                tracing::warn!("no API key configured; submissions will be rejected");
                None
            };
            App::new(session, client).run().await
        }
        Some(Commands::History) => commands::show_history(&config).await,
        Some(Commands::Ask { text }) => commands::ask(&config, &text).await,
        Some(Commands::Clear { yes }) => commands::clear_history(&config, yes).await,
    }
}
