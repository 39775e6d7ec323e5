//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use fixtrail::config::ConfigFileError;
use fixtrail::tracking::{StoreError, TrackingError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid command-line or configuration value
    Config(String),
    /// Failed to read or write the config file
    ConfigFile(ConfigFileError),
    /// Failed to read or write the tracking store
    Store(StoreError),
    /// Fix trace could not be loaded
    Trace { path: PathBuf, reason: String },
    /// Tracking engine refused an operation
    Tracking(TrackingError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Trace { .. } => {
                eprintln!();
                eprintln!("A trace is a JSON array of fixes, for example:");
                eprintln!(r#"  [{{"latitude": 43.6, "longitude": 1.44,"#);
                eprintln!(r#"    "accuracy": 5, "timestamp": 1700000000000}}]"#);
            }
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Run 'fixtrail config init' to write a fresh config file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Config file error: {}", e),
            CliError::Store(e) => write!(f, "Tracking store error: {}", e),
            CliError::Trace { path, reason } => {
                write!(f, "Failed to load trace '{}': {}", path.display(), reason)
            }
            CliError::Tracking(e) => write!(f, "Tracking failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Tracking(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<TrackingError> for CliError {
    fn from(e: TrackingError) -> Self {
        CliError::Tracking(e)
    }
}
