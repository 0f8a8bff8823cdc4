use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "hexscout")]
#[command(about = "Collect sanitized code-search evidence for contract addresses", version)]
pub struct Cli {
    /// Results per search page.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub per_page: Option<u32>,

    /// Cap on snippets in the final report.
    #[arg(long)]
    pub max_snippets: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collect evidence for a single contract address.
    Search(SearchArgs),
    /// Process addresses from a file, one per line.
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Contract address to investigate (`0x` plus 40 hex digits).
    #[arg(value_parser = parse_address)]
    pub address: String,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Address file: one address per line, `#` comments and blanks skipped.
    pub file: PathBuf,

    /// Delay between addresses in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,
}

pub(crate) fn parse_address(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if hexscout_core::sanitize::is_address(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(format!(
            "`{raw}` is not a contract address (expected 0x followed by 40 hex digits)"
        ))
    }
}
