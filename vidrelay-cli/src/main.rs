//! Vidrelay CLI - Command-line interface
//!
//! Runs the relay server, or performs a single stream or metadata lookup and
//! prints the JSON result.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use vidrelay_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "vidrelay")]
#[command(about = "Stream manifest relay with metadata search")]
struct Cli {
    /// Console log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory for a full trace log of this run
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.log_dir.as_deref())?;

    commands::run_command(cli.command).await?;

    Ok(())
}
