use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use hexscout_core::EvidencePipeline;
use hexscout_core::config::PipelineConfig;
use tracing::info;

use crate::cli::{Cli, Commands, parse_address};

/// Logs go to stderr and respect RUST_LOG, defaulting to `info`; stdout is
/// reserved for report JSON.
pub(crate) fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(per_page) = cli.per_page {
        config.github.per_page = per_page;
    }
    if let Some(max_snippets) = cli.max_snippets {
        config.selection.max_snippets = max_snippets;
    }

    let mut pipeline =
        EvidencePipeline::from_config(config).context("failed to build search pipeline")?;

    match cli.command {
        Commands::Search(args) => {
            let report = pipeline.collect(&args.address);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Batch(args) => {
            let addresses = read_address_file(&args.file)?;
            info!(count = addresses.len(), "processing address batch");
            for (index, address) in addresses.iter().enumerate() {
                // Fixed inter-address delay keeps the aggregate request rate
                // under the search service's quota.
                if index > 0 {
                    thread::sleep(Duration::from_millis(args.delay_ms));
                }
                let report = pipeline.collect(address);
                println!("{}", serde_json::to_string(&report)?);
            }
        }
    }

    Ok(())
}

fn read_address_file(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read address file {}", path.display()))?;

    let mut addresses = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let address = parse_address(trimmed)
            .map_err(|e| anyhow::anyhow!("{}:{}: {e}", path.display(), line_no + 1))?;
        addresses.push(address);
    }
    Ok(addresses)
}
