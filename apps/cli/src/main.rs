//! servicedata CLI — build-time data loader for the services site.
//!
//! Parses the services CSV, summarizes it, and exports both as JSON data
//! files for the static site generator.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
