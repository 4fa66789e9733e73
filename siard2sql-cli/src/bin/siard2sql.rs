//! A CLI tool for translating SIARD archives into SQLite-compliant SQL.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use siard2sql_cli::Cli;

fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    // Warnings (unreadable LOBs, skipped tables) go to stderr; RUST_LOG overrides the filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    Cli::parse().dispatch(&mut io::stdout().lock())?;

    Ok(ExitCode::SUCCESS)
}
