//! Main entry point for the kraken2_otu application.
//!
//! Converts Kraken2 mpa-style reports (one per sample) into the two tables
//! MicrobiomeAnalyst expects:
//! 1. An OTU abundance table: taxa at one rank x samples, read counts.
//! 2. A taxonomy table: the same taxa broken down into one column per level.
//!
//! Both tables are restricted to a single organism group before writing.

// Modules defined within the project
mod bio;
mod cli;
mod count_table;
mod io;
mod pipeline;
mod taxonomy_table;
use cli::{run_cli, Cli};

// External Crate Imports
use anyhow::Result;
use clap::Parser;

/// Main function: parses arguments and runs the conversion.
fn main() -> Result<()> {
    // Initialize logger, `info` unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    run_cli(cli)
}
