//! # isostore CLI Entry Point
//!
//! Parses arguments, configures logging and dispatches to the store
//! subcommands.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use iso_cli::commands::{run, Command};
use iso_cli::options::StoreOptions;
use iso_cli::EXIT_FAILURE;

/// Isolated storage from the command line.
///
/// Opens the store for the chosen scope and identity and runs one
/// operation on it.
#[derive(Parser, Debug)]
#[command(name = "isostore", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    store: StoreOptions,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();
    match run(&cli.store, &cli.command, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
