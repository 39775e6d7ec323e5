//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and store resolution
//! for commands that drive a tracking engine.

use std::path::{Path, PathBuf};

use fixtrail::config::ConfigFile;
use fixtrail::logging::{default_log_file, init_logging, LoggingGuard};
use fixtrail::tracking::JsonFileStore;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner with optional debug logging.
    ///
    /// # Arguments
    ///
    /// * `verbose` - When true, enables debug-level logging unless RUST_LOG says otherwise
    pub fn with_debug(verbose: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = ConfigFile::load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging(&log_dir, &log_file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("fixtrail v{}", fixtrail::VERSION);
        info!("fixtrail CLI: {} command", command);
    }

    /// Open the tracking store, preferring `store_override` over the config.
    pub fn open_store(&self, store_override: Option<&Path>) -> JsonFileStore {
        let store = crate::commands::common::open_store(&self.config, store_override);
        info!(directory = %store.dir().display(), "Using tracking store");
        store
    }
}
