//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::tracking::StaleFixPolicy;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Location-service monitor settings
    pub monitor: MonitorSettings,
    /// Fix source and filter settings
    pub tracking: TrackingSettings,
    /// Persistence settings
    pub storage: StorageSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Location-service monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Time between availability probes (milliseconds)
    pub probe_interval_ms: u64,
    /// Deadline for a single probe (milliseconds)
    pub probe_timeout_ms: u64,
}

/// Tracking configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    /// Foreground watch and single-shot request timeout (milliseconds)
    pub watch_timeout_ms: u64,
    /// What to do with fixes older than the last recorded one
    pub stale_fix_policy: StaleFixPolicy,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Directory holding `locationSettings.json` and `locationHistory.json`
    pub directory: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
