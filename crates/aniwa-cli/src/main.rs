//! Aniwa CLI — entry point.
//!
//! # Commands
//!
//! - `aniwa start [--logs] [--today FILE]` — connect to WhatsApp and run the episode notifier
//! - `aniwa onboard` — initialize config and the today file
//! - `aniwa status` — show configuration and session status
//! - `aniwa session reset` — wipe the stored WhatsApp session
//! - `aniwa schedule preview [--today FILE]` — show when today's episodes fire

mod gateway;
mod helpers;
mod inbound;
mod onboard;
mod schedule_cmd;
mod session_cmd;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Aniwa — WhatsApp bot that announces freshly aired anime episodes
#[derive(Parser)]
#[command(name = "aniwa", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and run the episode notifier
    Start {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// JSON file with today's tracked anime (overrides anime.todayFile)
        #[arg(long, value_name = "FILE")]
        today: Option<String>,
    },

    /// Initialize configuration and the today file
    Onboard,

    /// Show configuration and session status
    Status,

    /// Manage the stored WhatsApp session
    Session {
        #[command(subcommand)]
        action: session_cmd::SessionCommands,
    },

    /// Inspect today's schedule
    Schedule {
        #[command(subcommand)]
        action: schedule_cmd::ScheduleCommands,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { logs, today } => {
            init_logging(logs);
            gateway::run(today).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run().await,
        Commands::Session { action } => {
            init_logging(false);
            session_cmd::dispatch(action).await
        }
        Commands::Schedule { action } => {
            init_logging(false);
            schedule_cmd::dispatch(action).await
        }
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins over the flag.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("aniwa=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
