//! trackalt CLI: elevation enrichment for GPS track files.
//!
//! Reads a GPX file, looks up an altitude for every trackpoint in batches,
//! and writes the enriched track plus an optional JSON points report.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
