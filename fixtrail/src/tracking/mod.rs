//! Continuous location tracking.
//!
//! This module turns raw device positions into a filtered travel history
//! with running statistics, while switching between a precise foreground
//! source and a coarse background source as the app is suspended and
//! resumed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  FixEvent   ┌──────────────┐ accept ┌─────────────────────┐
//! │ LocationPlatform │────────────▶│  FixFilter   │───────▶│ history + stats     │
//! │ (watchers)       │             └──────────────┘        │ (StateCache publish)│
//! └────────▲─────────┘                                     └─────────────────────┘
//!          │ register / unregister
//! ┌────────┴─────────────┐    app state    ┌──────────────┐
//! │ TrackingStateMachine │◀────────────────│ AppLifecycle │
//! └──────────────────────┘                 └──────────────┘
//!
//! LocationServiceMonitor ── probe every 5s ──▶ availability (edge-triggered)
//! ```
//!
//! [`TrackingEngine`] owns all of the above and is the only type most
//! callers need.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fixtrail::tracking::{
//!     EngineConfig, LifecycleHub, MemoryStore, ReplayPlatform, TracingNotifier, TrackingEngine,
//! };
//!
//! let hub = LifecycleHub::new();
//! let engine = TrackingEngine::start(
//!     Arc::new(ReplayPlatform::new()),
//!     MemoryStore::new(),
//!     Arc::new(TracingNotifier),
//!     &hub,
//!     EngineConfig::default(),
//! )
//! .await;
//!
//! engine.start_tracking().await?;
//! let mut stats = engine.subscribe_stats();
//! ```

mod engine;
mod error;
mod filter;
mod fix;
mod geo;
mod lifecycle;
mod machine;
mod monitor;
mod notifier;
mod platform;
mod replay;
mod settings;
mod source;
mod state_cache;
mod stats;
mod store;

pub use engine::{EngineConfig, History, TrackingEngine};
pub use error::TrackingError;
pub use filter::{
    should_accept, FilterDecision, FixFilter, RejectReason, StaleFixPolicy, MAX_SILENCE_MS,
    MIN_ACCURACY_BUDGET_M, PROGRESS_DISTANCE_M,
};
pub use fix::{Coordinate, FixSource, LocationFix};
pub use geo::{coordinate_distance_m, fix_distance_m, haversine_m, EARTH_RADIUS_M};
pub use lifecycle::{AppLifecycle, LifecycleHub};
pub use machine::{TrackingMode, TrackingStateMachine};
pub use monitor::{
    LocationServiceMonitor, MonitorConfig, ProbeOutcome, DEFAULT_PROBE_INTERVAL,
    DEFAULT_PROBE_TIMEOUT,
};
pub use notifier::{Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use platform::{
    BackgroundWatchOptions, FixEvent, FixSink, LocationPlatform, PositionOptions, WatchId,
    DEFAULT_WATCH_TIMEOUT,
};
pub use replay::{PlatformCall, ReplayPlatform};
pub use settings::{
    AccuracyTier, ReferenceUpdate, SettingsPatch, TrackSettings, DEFAULT_MIN_RADIUS_METERS,
    DEFAULT_TRACKING_INTERVAL_SECS,
};
pub use source::{BackgroundWatcher, ForegroundWatcher, Watcher};
pub use state_cache::{StateCache, StateSubscription};
pub use stats::{StatsAggregator, TrackStats};
pub use store::{
    load_history, load_settings, save_history, save_settings, JsonFileStore, KeyValueStore,
    MemoryStore, StoreError, HISTORY_KEY, SETTINGS_KEY,
};
