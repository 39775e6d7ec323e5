//! History management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use fixtrail::config::ConfigFile;
use fixtrail::tracking::{load_history, save_history};

use super::common::open_store;
use crate::error::CliError;

/// History subcommands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommands {
    /// Delete every recorded fix
    Clear {
        /// Store directory (defaults to [storage] directory from config.ini)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
    },
}

/// Run a history subcommand.
pub async fn run(command: HistoryCommands) -> Result<(), CliError> {
    match command {
        HistoryCommands::Clear { store } => {
            let config = ConfigFile::load().unwrap_or_default();
            let store = open_store(&config, store.as_deref());

            let removed = load_history(&store).await.map(|h| h.len()).unwrap_or(0);
            save_history(&store, &[]).await?;

            println!("Cleared {} fixes from {}", removed, store.dir().display());
            Ok(())
        }
    }
}
