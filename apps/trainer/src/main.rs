use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::RestTrainerApi;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{CustomerCommand, TrainingCommand};
use config::{load_settings, load_settings_from, normalize_api_url};

#[derive(Parser, Debug)]
#[command(name = "trainer", about = "Manage personal trainer customers and trainings")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Customers(CustomerCommand),
    #[command(subcommand)]
    Trainings(TrainingCommand),
    /// Trainings of one month in start order.
    Calendar {
        /// `YYYY-MM`; defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    /// Total minutes per activity.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let api_url = normalize_api_url(cli.api_url.as_deref().unwrap_or(&settings.api_url))?;
    info!(%api_url, "using personal trainer api");
    let api = Arc::new(RestTrainerApi::new(api_url));

    match cli.command {
        Command::Customers(command) => commands::run_customers(api, &settings, command).await,
        Command::Trainings(command) => commands::run_trainings(api, command).await,
        Command::Calendar { month } => commands::run_calendar(&api, month.as_deref()).await,
        Command::Stats => commands::run_stats(&api).await,
    }
}
