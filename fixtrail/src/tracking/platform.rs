//! Location platform contract.
//!
//! [`LocationPlatform`] is the boundary to the device's positioning stack.
//! Watch callbacks are translated into a channel: the platform pushes
//! [`FixEvent`]s into a [`FixSink`], and the engine drains that channel in
//! arrival order.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use super::error::TrackingError;
use super::fix::LocationFix;

/// Default timeout for foreground watch requests.
pub const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Opaque id of a registered watcher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub String);

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event delivered by a registered watcher.
#[derive(Debug)]
pub enum FixEvent {
    /// A new position.
    Fix(LocationFix),
    /// The watcher reported an error.
    Error(TrackingError),
}

/// Channel end handed to watchers.
pub type FixSink = mpsc::UnboundedSender<FixEvent>;

/// Options for single-shot and foreground watch requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl PositionOptions {
    /// Options used by the location-service probe.
    pub fn probe(timeout: Duration) -> Self {
        Self {
            high_accuracy: false,
            timeout,
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_WATCH_TIMEOUT,
        }
    }
}

/// Options for the coarse background watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundWatchOptions {
    /// Title of the platform's foreground-service notification.
    pub notification_title: String,
    /// Body of the platform's foreground-service notification.
    pub notification_body: String,
    /// Ask for permission when missing.
    pub request_permissions: bool,
    /// Deliver cached (stale) positions.
    pub stale: bool,
    /// Minimum movement in meters between updates.
    pub distance_filter_meters: f64,
}

impl BackgroundWatchOptions {
    pub fn with_distance_filter(distance_filter_meters: f64) -> Self {
        Self {
            notification_title: "Location Tracking Active".to_string(),
            notification_body: "Location tracking is active".to_string(),
            request_permissions: true,
            stale: false,
            distance_filter_meters,
        }
    }
}

/// Device positioning stack.
pub trait LocationPlatform: Send + Sync + 'static {
    /// Whether location permission is currently granted.
    fn check_permission(&self) -> impl Future<Output = Result<bool, TrackingError>> + Send;

    /// Ask the user for location permission; returns whether it was granted.
    fn request_permission(&self) -> impl Future<Output = Result<bool, TrackingError>> + Send;

    /// Single-shot position request.
    fn get_once(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<LocationFix, TrackingError>> + Send;

    /// Register a foreground watcher.
    fn watch(
        &self,
        options: PositionOptions,
        sink: FixSink,
    ) -> impl Future<Output = Result<WatchId, TrackingError>> + Send;

    /// Remove a foreground watcher.
    fn unwatch(&self, id: &WatchId) -> impl Future<Output = Result<(), TrackingError>> + Send;

    /// Register the coarse background watcher.
    fn add_background_watcher(
        &self,
        options: BackgroundWatchOptions,
        sink: FixSink,
    ) -> impl Future<Output = Result<WatchId, TrackingError>> + Send;

    /// Remove the background watcher.
    fn remove_background_watcher(
        &self,
        id: &WatchId,
    ) -> impl Future<Output = Result<(), TrackingError>> + Send;
}
