//! # airdrop-cli
//!
//! CLI tool for exercising the airdrop session layer without a daemon.
//!
//! ## Commands
//!
//! - `replay`: Run a scripted daemon scenario against a live session
//! - `config`: Show the effective configuration
//!
//! ## Example
//!
//! ```bash
//! # Replay a scenario, one summary line per state change
//! airdrop-cli replay airdrop-cli/scenarios/startup.json
//!
//! # Same, as JSON lines
//! airdrop-cli replay airdrop-cli/scenarios/startup.json --json
//!
//! # Show which settings are in effect
//! airdrop-cli --config ./airdrop.toml config
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod render;

use commands::replay;
use config::CliConfig;

/// CLI tool for exercising the airdrop session layer.
#[derive(Parser, Debug)]
#[command(name = "airdrop-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: airdrop.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted daemon scenario against a live session
    Replay {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Print JSON lines instead of summaries
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) = CliConfig::resolve(cli.config.as_deref()).await?;
    setup_logging(&config.log.filter, cli.verbose);
    tracing::debug!(source = ?source, "Configuration loaded");

    match cli.command {
        Commands::Replay { scenario, json } => {
            replay::run(&scenario, config.session, json).await?;
        }
        Commands::Config => {
            commands::config::run(&config, source.as_deref())?;
        }
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over everything else.
fn setup_logging(configured: &str, verbosity: u8) {
    let filter = match verbosity {
        0 => configured,
        1 => "airdrop=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
