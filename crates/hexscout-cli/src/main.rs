mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn main() -> Result<()> {
    commands::init_tracing();
    let cli = Cli::parse();
    commands::run(cli)
}
