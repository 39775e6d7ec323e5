//! Default values and constants for all configuration settings.

use super::settings::*;
use crate::tracking::StaleFixPolicy;

/// Default probe interval (5 seconds).
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 5_000;

/// Default probe timeout (3 seconds).
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

/// Default foreground watch timeout (10 seconds).
pub const DEFAULT_WATCH_TIMEOUT_MS: u64 = 10_000;

/// Smallest accepted probe interval.
pub const MIN_PROBE_INTERVAL_MS: u64 = 100;

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            monitor: MonitorSettings {
                probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
                probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            },
            tracking: TrackingSettings {
                watch_timeout_ms: DEFAULT_WATCH_TIMEOUT_MS,
                stale_fix_policy: StaleFixPolicy::Reject,
            },
            storage: StorageSettings {
                directory: config_dir.join("data"),
            },
            logging: LoggingSettings {
                file: config_dir.join("logs").join("fixtrail.log"),
            },
        }
    }
}
