//! Fix sources.
//!
//! The platform exposes two different watcher APIs (foreground watch and
//! coarse background watcher). [`Watcher`] hides the difference so the state
//! machine can swap one for the other through a single code path.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::TrackingError;
use super::fix::FixSource;
use super::platform::{BackgroundWatchOptions, FixSink, LocationPlatform, PositionOptions, WatchId};
use super::settings::TrackSettings;

/// A registrable fix source.
pub trait Watcher: Send + Sync {
    /// Which kind of fixes this watcher produces.
    fn kind(&self) -> FixSource;

    /// Register with the platform; fixes flow into `sink`.
    fn register(
        &self,
        settings: &TrackSettings,
        sink: FixSink,
    ) -> impl Future<Output = Result<WatchId, TrackingError>> + Send;

    /// Remove a registration made by [`Watcher::register`].
    fn unregister(&self, id: &WatchId) -> impl Future<Output = Result<(), TrackingError>> + Send;
}

/// Map a platform registration failure. Permission problems keep their
/// identity so the caller can treat them as revocation.
fn registration_error(kind: FixSource, err: TrackingError) -> TrackingError {
    match err {
        TrackingError::PermissionDenied => TrackingError::PermissionDenied,
        other => TrackingError::WatcherRegistration {
            source_kind: kind,
            reason: other.to_string(),
        },
    }
}

/// Foreground watcher: precise, only alive while the app is active.
pub struct ForegroundWatcher<P> {
    platform: Arc<P>,
    timeout: Duration,
}

impl<P: LocationPlatform> ForegroundWatcher<P> {
    pub fn new(platform: Arc<P>, timeout: Duration) -> Self {
        Self { platform, timeout }
    }

    fn options(&self, settings: &TrackSettings) -> PositionOptions {
        PositionOptions {
            high_accuracy: settings.accuracy_tier.wants_high_accuracy(),
            timeout: self.timeout,
        }
    }
}

impl<P: LocationPlatform> Watcher for ForegroundWatcher<P> {
    fn kind(&self) -> FixSource {
        FixSource::Foreground
    }

    async fn register(
        &self,
        settings: &TrackSettings,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError> {
        let options = self.options(settings);
        self.platform
            .watch(options, sink)
            .await
            .map_err(|e| registration_error(FixSource::Foreground, e))
    }

    async fn unregister(&self, id: &WatchId) -> Result<(), TrackingError> {
        self.platform.unwatch(id).await
    }
}

/// Background watcher: coarse, distance-filtered, survives suspension.
pub struct BackgroundWatcher<P> {
    platform: Arc<P>,
}

impl<P: LocationPlatform> BackgroundWatcher<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

impl<P: LocationPlatform> Watcher for BackgroundWatcher<P> {
    fn kind(&self) -> FixSource {
        FixSource::Background
    }

    async fn register(
        &self,
        settings: &TrackSettings,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError> {
        let options =
            BackgroundWatchOptions::with_distance_filter(settings.background_distance_filter());
        self.platform
            .add_background_watcher(options, sink)
            .await
            .map_err(|e| registration_error(FixSource::Background, e))
    }

    async fn unregister(&self, id: &WatchId) -> Result<(), TrackingError> {
        self.platform.remove_background_watcher(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::replay::{PlatformCall, ReplayPlatform};
    use crate::tracking::settings::AccuracyTier;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_foreground_options_follow_accuracy_tier() {
        let platform = Arc::new(ReplayPlatform::new());
        let watcher = ForegroundWatcher::new(platform.clone(), Duration::from_secs(10));
        let (tx, _rx) = mpsc::unbounded_channel();

        let settings = TrackSettings {
            accuracy_tier: AccuracyTier::Low,
            ..Default::default()
        };
        let id = watcher.register(&settings, tx).await.unwrap();

        assert!(platform.calls().contains(&PlatformCall::Watch {
            id: id.clone(),
            high_accuracy: false
        }));
        watcher.unregister(&id).await.unwrap();
        assert_eq!(platform.active_foreground(), 0);
    }

    #[tokio::test]
    async fn test_background_distance_filter() {
        let platform = Arc::new(ReplayPlatform::new());
        let watcher = BackgroundWatcher::new(platform.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let settings = TrackSettings {
            min_radius_meters: 4.0,
            ..Default::default()
        };
        let id = watcher.register(&settings, tx).await.unwrap();

        assert!(platform.calls().contains(&PlatformCall::AddBackgroundWatcher {
            id,
            distance_filter_meters: 10.0
        }));
    }

    #[tokio::test]
    async fn test_registration_failure_is_wrapped() {
        let platform = Arc::new(ReplayPlatform::new());
        platform.fail_next_registration(FixSource::Background);
        let watcher = BackgroundWatcher::new(platform);
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = watcher.register(&TrackSettings::default(), tx).await.unwrap_err();
        assert!(matches!(
            err,
            TrackingError::WatcherRegistration {
                source_kind: FixSource::Background,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_permission_denial_keeps_identity() {
        let platform = Arc::new(ReplayPlatform::new());
        platform.set_permission(false, false);
        let watcher = BackgroundWatcher::new(platform);
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = watcher.register(&TrackSettings::default(), tx).await.unwrap_err();
        assert!(err.is_permission_denied());
    }
}
