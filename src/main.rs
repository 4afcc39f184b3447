use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;
mod config;
mod events;
mod gateway;
mod model;
mod session;
mod storage;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "healthcoach")]
#[command(version)]
#[command(about = "Chat with your Health Coach from the terminal", long_about = None)]
struct Cli {
    /// Base URL of the answering service
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory holding config, chats and the log file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved chats, most recent first
    List,
    /// Write a default config file
    Init,
}

fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .context("Failed to open log file")?;

    let default_filter = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.data_dir)?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    init_logging(&config, cli.debug)?;

    match cli.command {
        None => app::run(config).await,
        Some(Commands::List) => commands::list_chats(&config),
        Some(Commands::Init) => commands::init_config(&config),
    }
}
