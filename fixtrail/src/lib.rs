//! fixtrail - Continuous location tracking
//!
//! This library records a filtered travel history from a stream of device
//! position fixes, keeps running distance/time statistics, and manages the
//! hand-over between a precise foreground fix source and a coarse background
//! source as the host app is suspended and resumed.
//!
//! # High-Level API
//!
//! The [`tracking`] module's [`TrackingEngine`](tracking::TrackingEngine) is
//! the facade most callers need:
//!
//! ```ignore
//! use std::sync::Arc;
//! use fixtrail::config::ConfigFile;
//! use fixtrail::tracking::{JsonFileStore, LifecycleHub, TracingNotifier, TrackingEngine};
//!
//! let config = ConfigFile::load()?;
//! let lifecycle = LifecycleHub::new();
//! let engine = TrackingEngine::start(
//!     platform,
//!     JsonFileStore::new(&config.storage.directory),
//!     Arc::new(TracingNotifier),
//!     &lifecycle,
//!     config.engine_config(),
//! )
//! .await;
//!
//! engine.start_tracking().await?;
//! lifecycle.set_active(false); // app suspended: background source takes over
//! ```

pub mod config;
pub mod logging;
pub mod time;
pub mod tracking;

/// Version of the fixtrail library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
