//! Vouch CLI
//!
//! Operator tooling for the invitation relay: validate a configuration file
//! and run a complete greeter/claimer pairing in-process.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{check_config, simulate};

#[derive(Parser)]
#[command(name = "vouch")]
#[command(about = "Vouch - invitation relay for onboarding users and devices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    CheckConfig {
        /// Config file path
        #[arg(short, long, default_value = "vouch.toml")]
        config: PathBuf,
    },

    /// Run a full pairing handshake against the in-memory stack
    Simulate {
        /// Invite a user with this e-mail instead of a device
        #[arg(long)]
        user: Option<String>,

        /// Number of messages exchanged once the handshake completes
        #[arg(short, long, default_value = "3")]
        messages: u32,

        /// Config file path (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    vouch_service::init_tracing(log_level);

    match cli.command {
        Commands::CheckConfig { config } => {
            check_config::run(&config)?;
        }
        Commands::Simulate {
            user,
            messages,
            config,
        } => {
            simulate::run(config.as_deref(), user, messages).await?;
        }
    }

    Ok(())
}
