//! Chunkreader CLI - read long texts one chunk at a time.
//!
//! # Usage
//!
//! ```bash
//! # Add a text and start reading
//! cr add "War and Peace" war-and-peace.txt
//! cr select "War and Peace"
//! cr next
//! cr page 42
//!
//! # Scripting
//! cr list --json
//! cr export --after 2024-01-01T00:00:00Z --json
//!
//! # Show help
//! cr --help
//! ```

mod commands;
mod config;
mod output;

use anyhow::Result;
use chunkreader_core::{ReaderService, UserId};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Chunkreader command-line reader.
///
/// Splits texts into sentence-respecting chunks and remembers where each
/// user stopped reading.
#[derive(Parser)]
#[command(name = "cr", version, about)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Acting user id
    #[arg(long, env = config::USER_ENV, default_value = "0", global = true)]
    user: i64,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Custom data directory (default: platform standard location)
    #[arg(long, env = config::DATA_DIR_ENV, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store = config::open_store(cli.data_dir.as_ref())?;
    let reader = ReaderService::new(store);
    let report = commands::execute(&cli.command, &reader, UserId::from_i64(cli.user)).await?;

    let output = if cli.json {
        output::format_json(&report)
    } else {
        output::format_human(&report)
    };
    println!("{}", output);

    Ok(())
}
