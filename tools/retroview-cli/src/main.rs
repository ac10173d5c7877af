//! Retroview CLI - Validate and drive emulation sessions
//!
//! # Commands
//!
//! - `retroview check` - Parse and validate a session file
//! - `retroview simulate` - Run a session end to end on the headless engine
//!
//! # Usage
//!
//! ```bash
//! # Validate the default session file (<config_dir>/session.toml)
//! retroview check
//!
//! # Run 120 frames of a game at double speed
//! retroview simulate session.toml --game game.rom --frames 120 --speed 2
//! ```
//!
//! Logging follows `RUST_LOG` and defaults to `info`.

mod check;
mod simulate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Retroview CLI - Validate and drive emulation sessions
#[derive(Parser)]
#[command(name = "retroview")]
#[command(about = "Validate and drive Retroview emulation sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a session file
    Check(check::CheckArgs),

    /// Run a session against the headless engine
    Simulate(simulate::SimulateArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => check::execute(args),
        Commands::Simulate(args) => simulate::execute(args),
    }
}
