//! Tracking state machine.
//!
//! Owns the registered watcher ids and moves between the three
//! [`TrackingMode`]s:
//!
//! ```text
//!            start                 backgrounded
//!   Idle ───────────▶ Foreground ───────────────▶ Background
//!    ▲                  Active   ◀─────────────── Active
//!    │                    │         foregrounded     │
//!    └────────────────────┴──────────────────────────┘
//!             stop / permission revoked
//! ```
//!
//! Source swaps always register the incoming watcher before removing the
//! outgoing one, so there is never a window with no source. A short window
//! with both sources alive is expected; the fix filter drops the duplicates.
//!
//! A watcher whose removal fails is kept as stale and removed again on the
//! next swap or stop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::TrackingError;
use super::platform::{FixSink, LocationPlatform, WatchId};
use super::settings::TrackSettings;
use super::source::{BackgroundWatcher, ForegroundWatcher, Watcher};
use super::state_cache::StateCache;

/// Which fix source is feeding the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackingMode {
    #[default]
    Idle,
    ForegroundActive,
    BackgroundActive,
}

impl TrackingMode {
    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ForegroundActive => write!(f, "foreground"),
            Self::BackgroundActive => write!(f, "background"),
        }
    }
}

/// Unregister every id in `ids`. Returns the ids whose removal failed.
async fn retire<W: Watcher>(watcher: &W, ids: Vec<WatchId>) -> Vec<WatchId> {
    let mut failed = Vec::new();
    for id in ids {
        match watcher.unregister(&id).await {
            Ok(()) => debug!(kind = %watcher.kind(), id = %id, "Watcher removed"),
            Err(e) => {
                warn!(kind = %watcher.kind(), id = %id, error = %e, "Failed to remove watcher");
                failed.push(id);
            }
        }
    }
    failed
}

/// Register `incoming`, then retire the registration in `outgoing_id`
/// along with any stale `outgoing` ids.
///
/// On registration failure nothing is retired. Ids that cannot be removed
/// are left in `outgoing_stale`.
async fn cross_over<A: Watcher, B: Watcher>(
    incoming: &A,
    outgoing: &B,
    outgoing_id: &mut Option<WatchId>,
    outgoing_stale: &mut Vec<WatchId>,
    settings: &TrackSettings,
    sink: &FixSink,
) -> Result<WatchId, TrackingError> {
    let id = incoming.register(settings, sink.clone()).await?;
    debug!(kind = %incoming.kind(), id = %id, "Watcher registered");

    let mut pending = std::mem::take(outgoing_stale);
    pending.extend(outgoing_id.take());
    *outgoing_stale = retire(outgoing, pending).await;
    Ok(id)
}

/// Source lifecycle for one engine.
///
/// Not internally synchronized: the engine serializes access.
pub struct TrackingStateMachine<P> {
    platform: Arc<P>,
    foreground: ForegroundWatcher<P>,
    background: BackgroundWatcher<P>,
    sink: FixSink,
    foreground_id: Option<WatchId>,
    background_id: Option<WatchId>,
    stale_foreground: Vec<WatchId>,
    stale_background: Vec<WatchId>,
    mode: StateCache<TrackingMode>,
}

impl<P: LocationPlatform> TrackingStateMachine<P> {
    pub fn new(platform: Arc<P>, sink: FixSink, watch_timeout: Duration) -> Self {
        Self {
            foreground: ForegroundWatcher::new(Arc::clone(&platform), watch_timeout),
            background: BackgroundWatcher::new(Arc::clone(&platform)),
            platform,
            sink,
            foreground_id: None,
            background_id: None,
            stale_foreground: Vec::new(),
            stale_background: Vec::new(),
            mode: StateCache::new(TrackingMode::Idle),
        }
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode.get()
    }

    /// Watchers whose removal failed and is still pending.
    pub fn stale_watchers(&self) -> usize {
        self.stale_foreground.len() + self.stale_background.len()
    }

    /// Publish point for mode changes.
    pub fn mode_cache(&self) -> &StateCache<TrackingMode> {
        &self.mode
    }

    /// Idle → ForegroundActive.
    ///
    /// Requests permission when it is missing. A no-op when already active.
    pub async fn start(&mut self, settings: &TrackSettings) -> Result<TrackingMode, TrackingError> {
        let mode = self.mode();
        if mode.is_active() {
            return Ok(mode);
        }

        self.ensure_permission().await?;
        let id = self.foreground.register(settings, self.sink.clone()).await?;
        debug!(id = %id, "Foreground watcher registered");
        self.foreground_id = Some(id);
        Ok(self.transition(TrackingMode::ForegroundActive))
    }

    /// Any → Idle. Removes every registration it holds, stale ones
    /// included. Ids that still cannot be removed are kept for the next
    /// stop.
    ///
    /// Returns the mode that was left.
    pub async fn stop(&mut self) -> TrackingMode {
        let mut foreground = std::mem::take(&mut self.stale_foreground);
        foreground.extend(self.foreground_id.take());
        self.stale_foreground = retire(&self.foreground, foreground).await;

        let mut background = std::mem::take(&mut self.stale_background);
        background.extend(self.background_id.take());
        self.stale_background = retire(&self.background, background).await;

        let previous = self.mode();
        self.transition(TrackingMode::Idle);
        previous
    }

    /// ForegroundActive → BackgroundActive, when background tracking is
    /// enabled. On failure the foreground watcher stays registered.
    pub async fn on_backgrounded(
        &mut self,
        settings: &TrackSettings,
    ) -> Result<TrackingMode, TrackingError> {
        let mode = self.mode();
        if mode != TrackingMode::ForegroundActive || !settings.background_tracking_enabled {
            return Ok(mode);
        }

        let id = cross_over(
            &self.background,
            &self.foreground,
            &mut self.foreground_id,
            &mut self.stale_foreground,
            settings,
            &self.sink,
        )
        .await?;
        self.background_id = Some(id);
        Ok(self.transition(TrackingMode::BackgroundActive))
    }

    /// BackgroundActive → ForegroundActive. On failure the background
    /// watcher stays registered.
    pub async fn on_foregrounded(
        &mut self,
        settings: &TrackSettings,
    ) -> Result<TrackingMode, TrackingError> {
        let mode = self.mode();
        if mode != TrackingMode::BackgroundActive {
            return Ok(mode);
        }

        let id = cross_over(
            &self.foreground,
            &self.background,
            &mut self.background_id,
            &mut self.stale_background,
            settings,
            &self.sink,
        )
        .await?;
        self.foreground_id = Some(id);
        Ok(self.transition(TrackingMode::ForegroundActive))
    }

    /// Any active mode → Idle. Returns whether tracking was stopped.
    pub async fn on_permission_revoked(&mut self) -> bool {
        if !self.mode().is_active() {
            return false;
        }
        warn!("Location permission revoked, stopping tracking");
        self.stop().await;
        true
    }

    async fn ensure_permission(&self) -> Result<(), TrackingError> {
        if self.platform.check_permission().await? {
            return Ok(());
        }
        info!("Requesting location permission");
        if self.platform.request_permission().await? {
            Ok(())
        } else {
            Err(TrackingError::PermissionDenied)
        }
    }

    fn transition(&self, next: TrackingMode) -> TrackingMode {
        if let Some(previous) = self.mode.publish_if_changed(next) {
            info!(from = %previous, to = %next, "Tracking mode changed");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::fix::FixSource;
    use crate::tracking::platform::DEFAULT_WATCH_TIMEOUT;
    use crate::tracking::replay::{PlatformCall, ReplayPlatform};
    use tokio::sync::mpsc;

    fn machine(platform: &Arc<ReplayPlatform>) -> TrackingStateMachine<ReplayPlatform> {
        let (tx, _rx) = mpsc::unbounded_channel();
        TrackingStateMachine::new(Arc::clone(platform), tx, DEFAULT_WATCH_TIMEOUT)
    }

    fn background_enabled() -> TrackSettings {
        TrackSettings {
            background_tracking_enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_registers_foreground() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);

        let mode = machine.start(&TrackSettings::default()).await.unwrap();
        assert_eq!(mode, TrackingMode::ForegroundActive);
        assert_eq!(platform.active_foreground(), 1);

        // Second start is a no-op
        machine.start(&TrackSettings::default()).await.unwrap();
        assert_eq!(platform.active_foreground(), 1);
    }

    #[tokio::test]
    async fn test_start_requests_missing_permission() {
        let platform = Arc::new(ReplayPlatform::new());
        platform.set_permission(false, true);
        let mut machine = machine(&platform);

        machine.start(&TrackSettings::default()).await.unwrap();
        assert!(platform.calls().contains(&PlatformCall::RequestPermission));
    }

    #[tokio::test]
    async fn test_start_denied_stays_idle() {
        let platform = Arc::new(ReplayPlatform::new());
        platform.set_permission(false, false);
        let mut machine = machine(&platform);

        let err = machine.start(&TrackSettings::default()).await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(machine.mode(), TrackingMode::Idle);
        assert_eq!(platform.active_foreground(), 0);
    }

    #[tokio::test]
    async fn test_background_crossover_registers_before_removing() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        let mut modes = machine.mode_cache().subscribe();

        machine.start(&background_enabled()).await.unwrap();
        machine.on_backgrounded(&background_enabled()).await.unwrap();
        machine.on_foregrounded(&background_enabled()).await.unwrap();

        let seen: Vec<_> = std::iter::from_fn(|| modes.try_recv()).collect();
        assert_eq!(
            seen,
            vec![
                TrackingMode::Idle,
                TrackingMode::ForegroundActive,
                TrackingMode::BackgroundActive,
                TrackingMode::ForegroundActive,
            ]
        );

        let calls = platform.calls();
        let add_bg = calls
            .iter()
            .position(|c| matches!(c, PlatformCall::AddBackgroundWatcher { .. }))
            .unwrap();
        let first_unwatch = calls
            .iter()
            .position(|c| matches!(c, PlatformCall::Unwatch { .. }))
            .unwrap();
        assert!(add_bg < first_unwatch);
        assert_eq!(platform.active_foreground(), 1);
        assert_eq!(platform.active_background(), 0);
    }

    #[tokio::test]
    async fn test_backgrounded_without_background_tracking_is_noop() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);

        machine.start(&TrackSettings::default()).await.unwrap();
        let mode = machine.on_backgrounded(&TrackSettings::default()).await.unwrap();

        assert_eq!(mode, TrackingMode::ForegroundActive);
        assert_eq!(platform.active_background(), 0);
    }

    #[tokio::test]
    async fn test_failed_crossover_keeps_prior_source() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&background_enabled()).await.unwrap();

        platform.fail_next_registration(FixSource::Background);
        let err = machine.on_backgrounded(&background_enabled()).await.unwrap_err();

        assert!(matches!(err, TrackingError::WatcherRegistration { .. }));
        assert_eq!(machine.mode(), TrackingMode::ForegroundActive);
        assert_eq!(platform.active_foreground(), 1);
    }

    #[tokio::test]
    async fn test_failed_removal_still_hands_over() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&background_enabled()).await.unwrap();

        platform.fail_next_removal(FixSource::Foreground);
        let mode = machine.on_backgrounded(&background_enabled()).await.unwrap();

        assert_eq!(mode, TrackingMode::BackgroundActive);
        assert_eq!(machine.mode(), TrackingMode::BackgroundActive);
        assert_eq!(platform.active_background(), 1);
        assert_eq!(platform.active_foreground(), 1);
        assert_eq!(machine.stale_watchers(), 1);
    }

    #[tokio::test]
    async fn test_stale_watcher_removed_on_next_swap() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&background_enabled()).await.unwrap();

        platform.fail_next_removal(FixSource::Foreground);
        machine.on_backgrounded(&background_enabled()).await.unwrap();
        machine.on_foregrounded(&background_enabled()).await.unwrap();
        machine.on_backgrounded(&background_enabled()).await.unwrap();

        assert_eq!(platform.active_foreground(), 0);
        assert_eq!(platform.active_background(), 1);
        assert_eq!(machine.stale_watchers(), 0);
    }

    #[tokio::test]
    async fn test_stop_removes_stale_watchers() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&background_enabled()).await.unwrap();

        platform.fail_next_removal(FixSource::Foreground);
        machine.on_backgrounded(&background_enabled()).await.unwrap();
        machine.stop().await;

        assert_eq!(platform.active_foreground(), 0);
        assert_eq!(platform.active_background(), 0);
        assert_eq!(machine.stale_watchers(), 0);
    }

    #[tokio::test]
    async fn test_stop_keeps_unremovable_watcher_for_retry() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&TrackSettings::default()).await.unwrap();

        platform.fail_next_removal(FixSource::Foreground);
        assert_eq!(machine.stop().await, TrackingMode::ForegroundActive);
        assert_eq!(machine.mode(), TrackingMode::Idle);
        assert_eq!(platform.active_foreground(), 1);

        machine.stop().await;
        assert_eq!(platform.active_foreground(), 0);
        assert_eq!(machine.stale_watchers(), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        machine.start(&background_enabled()).await.unwrap();
        machine.on_backgrounded(&background_enabled()).await.unwrap();

        assert_eq!(machine.stop().await, TrackingMode::BackgroundActive);
        assert_eq!(machine.stop().await, TrackingMode::Idle);
        assert_eq!(platform.active_foreground(), 0);
        assert_eq!(platform.active_background(), 0);
    }

    #[tokio::test]
    async fn test_permission_revoked() {
        let platform = Arc::new(ReplayPlatform::new());
        let mut machine = machine(&platform);
        assert!(!machine.on_permission_revoked().await);

        machine.start(&TrackSettings::default()).await.unwrap();
        assert!(machine.on_permission_revoked().await);
        assert_eq!(machine.mode(), TrackingMode::Idle);
        assert_eq!(platform.active_foreground(), 0);
    }
}
