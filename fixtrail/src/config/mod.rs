//! Configuration for fixtrail.
//!
//! User configuration lives in `~/.fixtrail/config.ini`:
//!
//! ```ini
//! [monitor]
//! probe_interval_ms = 5000
//! probe_timeout_ms = 3000
//!
//! [tracking]
//! watch_timeout_ms = 10000
//! stale_fix_policy = reject
//!
//! [storage]
//! directory = ~/.fixtrail/data
//!
//! [logging]
//! file = ~/.fixtrail/logs/fixtrail.log
//! ```
//!
//! Missing keys keep their defaults. [`ConfigFile::engine_config`] turns the
//! file into the runtime [`EngineConfig`](crate::tracking::EngineConfig).
//!
//! # Example
//!
//! ```
//! use fixtrail::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let engine_config = config.engine_config();
//! assert_eq!(engine_config.monitor.probe_interval.as_millis(), 5000);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, LoggingSettings, MonitorSettings, StorageSettings, TrackingSettings};
