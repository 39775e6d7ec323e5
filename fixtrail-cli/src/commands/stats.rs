//! Trip statistics command.

use std::path::PathBuf;

use clap::Args;
use fixtrail::config::ConfigFile;
use fixtrail::tracking::{load_history, StatsAggregator};

use super::common::{open_store, print_stats};
use crate::error::CliError;

/// Arguments for `fixtrail stats`.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Store directory (defaults to [storage] directory from config.ini)
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Print the stats as JSON
    #[arg(long)]
    pub json: bool,
}

/// Print stats recomputed from the stored history.
pub async fn run(args: StatsArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let store = open_store(&config, args.store.as_deref());

    let history = load_history(&store).await?;
    let aggregator = StatsAggregator::recompute_from_history(&history);

    if args.json {
        let json = serde_json::to_string_pretty(aggregator.stats())
            .map_err(|e| CliError::Config(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Trip history: {}", store.dir().display());
    if history.is_empty() {
        println!("  No fixes recorded.");
        return Ok(());
    }
    print_stats(aggregator.stats(), history.len());
    Ok(())
}
