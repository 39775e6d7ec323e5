//! Tracking engine facade.
//!
//! [`TrackingEngine`] wires the pieces together:
//!
//! ```text
//! platform watchers ──FixEvent──▶ fix pipeline task ──▶ FixFilter
//!                                                         │ accept
//!                                                         ▼
//!                                  history + StatsAggregator ──▶ StateCache
//! lifecycle hub ──bool──▶ lifecycle task ──▶ TrackingStateMachine
//! ```
//!
//! User commands and lifecycle events are serialized on the state machine's
//! lock. The recorder (history and stats) has its own lock, so fixes keep
//! being recorded while a source swap is in flight. When both are needed the
//! state machine is always locked first. Writes of the tracking switch
//! happen under the state machine's lock too, so the stored switch and the
//! mode always agree once a command returns.
//!
//! Every mutation of settings or history is written back to the store.
//! Storage failures are logged and never abort the operation.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::TrackingError;
use super::filter::{FilterDecision, FixFilter, StaleFixPolicy};
use super::fix::{Coordinate, LocationFix};
use super::geo::coordinate_distance_m;
use super::lifecycle::AppLifecycle;
use super::machine::{TrackingMode, TrackingStateMachine};
use super::monitor::{LocationServiceMonitor, MonitorConfig};
use super::notifier::Notifier;
use super::platform::{FixEvent, LocationPlatform, PositionOptions, DEFAULT_WATCH_TIMEOUT};
use super::settings::{ReferenceUpdate, SettingsPatch, TrackSettings};
use super::state_cache::{StateCache, StateSubscription};
use super::stats::{StatsAggregator, TrackStats};
use super::store::{load_history, load_settings, save_history, save_settings, KeyValueStore};
use crate::time::now_ms;

/// Shared, immutable snapshot of the recorded history.
pub type History = Arc<Vec<LocationFix>>;

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub monitor: MonitorConfig,
    /// Timeout passed to foreground watch and single-shot requests.
    pub watch_timeout: Duration,
    pub stale_fix_policy: StaleFixPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            watch_timeout: DEFAULT_WATCH_TIMEOUT,
            stale_fix_policy: StaleFixPolicy::default(),
        }
    }
}

struct Recorder {
    filter: FixFilter,
    history: Vec<LocationFix>,
    stats: StatsAggregator,
}

struct EngineInner<P, S, N> {
    platform: Arc<P>,
    store: S,
    notifier: Arc<N>,
    config: EngineConfig,
    machine: Mutex<TrackingStateMachine<P>>,
    recorder: Mutex<Recorder>,
    settings_write: Mutex<()>,
    settings: StateCache<TrackSettings>,
    history: StateCache<History>,
    stats: StateCache<TrackStats>,
    mode: StateCache<TrackingMode>,
    monitor: LocationServiceMonitor<P, N>,
    flush: mpsc::UnboundedSender<oneshot::Sender<()>>,
    cancellation: CancellationToken,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<P, S, N> Drop for EngineInner<P, S, N> {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Continuous location-tracking engine.
///
/// Cheap to clone; clones share the same engine. Background tasks only hold
/// weak references, so dropping the last handle stops them.
pub struct TrackingEngine<P, S, N> {
    inner: Arc<EngineInner<P, S, N>>,
}

impl<P, S, N> Clone for TrackingEngine<P, S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, S, N> TrackingEngine<P, S, N>
where
    P: LocationPlatform,
    S: KeyValueStore,
    N: Notifier,
{
    /// Load persisted state and start the engine's background tasks.
    ///
    /// Unreadable stored state falls back to defaults. If tracking was
    /// enabled when the state was saved, tracking is resumed.
    pub async fn start<L>(
        platform: Arc<P>,
        store: S,
        notifier: Arc<N>,
        lifecycle: &L,
        config: EngineConfig,
    ) -> Self
    where
        L: AppLifecycle + ?Sized,
    {
        let settings = load_settings(&store).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load settings, using defaults");
            TrackSettings::default()
        });
        let history = load_history(&store).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load location history, starting empty");
            Vec::new()
        });
        let stats = StatsAggregator::recompute_from_history(&history);

        let (sink, fixes) = mpsc::unbounded_channel();
        let (flush, flush_requests) = mpsc::unbounded_channel();
        let machine = TrackingStateMachine::new(Arc::clone(&platform), sink, config.watch_timeout);
        let mode = machine.mode_cache().clone();

        let cancellation = CancellationToken::new();
        let monitor = LocationServiceMonitor::new(
            Arc::clone(&platform),
            Arc::clone(&notifier),
            config.monitor,
            cancellation.child_token(),
        );

        info!(
            fixes = history.len(),
            total_distance_m = stats.stats().total_distance_meters,
            tracking_enabled = settings.tracking_enabled,
            "Tracking engine starting"
        );

        let resume = settings.tracking_enabled;
        let inner = Arc::new(EngineInner {
            platform,
            store,
            notifier,
            config,
            machine: Mutex::new(machine),
            recorder: Mutex::new(Recorder {
                filter: FixFilter::new(config.stale_fix_policy),
                history: history.clone(),
                stats: stats.clone(),
            }),
            settings_write: Mutex::new(()),
            settings: StateCache::new(settings),
            history: StateCache::new(Arc::new(history)),
            stats: StateCache::new(stats.stats().clone()),
            mode,
            monitor,
            flush,
            cancellation: cancellation.clone(),
            tasks: std::sync::Mutex::new(Vec::new()),
        });

        let pipeline = tokio::spawn(run_fix_pipeline(
            Arc::downgrade(&inner),
            fixes,
            flush_requests,
            cancellation.clone(),
        ));
        let lifecycle_task = tokio::spawn(run_lifecycle(
            Arc::downgrade(&inner),
            lifecycle.subscribe(),
            cancellation,
        ));
        inner
            .tasks
            .lock()
            .unwrap()
            .extend([pipeline, lifecycle_task]);
        inner.monitor.resume();

        let engine = Self { inner };
        if resume {
            let inner = &engine.inner;
            let mut machine = inner.machine.lock().await;
            if let Err(e) = inner.activate(&mut machine).await {
                warn!(error = %e, "Could not resume tracking");
            }
        }
        engine
    }

    /// Enable tracking and register the foreground source.
    pub async fn start_tracking(&self) -> Result<TrackingMode, TrackingError> {
        self.inner.start_tracking().await
    }

    /// Disable tracking and remove every source.
    pub async fn stop_tracking(&self) {
        self.inner.stop_tracking().await
    }

    /// React to the app becoming active (`true`) or inactive (`false`).
    pub async fn handle_app_state(&self, is_active: bool) {
        self.inner.handle_app_state(is_active).await
    }

    /// Merge `patch` into the settings and persist them.
    ///
    /// Toggling `tracking_enabled` starts or stops tracking.
    pub async fn update_settings(&self, patch: SettingsPatch) -> TrackSettings {
        self.inner.update_settings(patch).await
    }

    /// Empty the history and zero the stats.
    pub async fn clear_history(&self) {
        self.inner.clear_history().await
    }

    /// One-shot position at the configured accuracy.
    pub async fn current_position(&self) -> Result<LocationFix, TrackingError> {
        self.inner.current_position().await
    }

    pub async fn set_reference_point(&self, point: Coordinate) -> TrackSettings {
        self.inner
            .update_settings(SettingsPatch {
                reference_point: ReferenceUpdate::Set(point),
                ..Default::default()
            })
            .await
    }

    /// Use the device's current position as the reference point.
    pub async fn set_reference_from_current_position(&self) -> Result<Coordinate, TrackingError> {
        let fix = self.inner.current_position().await?;
        let point = fix.coordinate();
        self.set_reference_point(point).await;
        Ok(point)
    }

    pub async fn clear_reference_point(&self) -> TrackSettings {
        self.inner
            .update_settings(SettingsPatch {
                reference_point: ReferenceUpdate::Clear,
                ..Default::default()
            })
            .await
    }

    /// Distance in meters of the last recorded fix from the reference point.
    pub fn distance_from_reference(&self) -> Option<f64> {
        let reference = self.inner.settings.with(|s| s.reference_point)?;
        let last = self.inner.history.with(|h| h.last().map(|f| f.coordinate()))?;
        Some(coordinate_distance_m(reference, last))
    }

    /// Wait until every fix delivered so far has been processed.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.inner.flush.send(ack).is_ok() {
            // Err means the pipeline already stopped
            let _ = done.await;
        }
    }

    /// Cancel background tasks and remove every source.
    ///
    /// Settings are left as they are, so an enabled session resumes on the
    /// next start.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await
    }

    pub fn settings(&self) -> TrackSettings {
        self.inner.settings.get()
    }

    pub fn history(&self) -> History {
        self.inner.history.get()
    }

    pub fn stats(&self) -> TrackStats {
        self.inner.stats.get()
    }

    pub fn mode(&self) -> TrackingMode {
        self.inner.mode.get()
    }

    pub fn location_services_available(&self) -> bool {
        self.inner.monitor.availability().get()
    }

    pub fn subscribe_settings(&self) -> StateSubscription<TrackSettings> {
        self.inner.settings.subscribe()
    }

    pub fn subscribe_history(&self) -> StateSubscription<History> {
        self.inner.history.subscribe()
    }

    pub fn subscribe_stats(&self) -> StateSubscription<TrackStats> {
        self.inner.stats.subscribe()
    }

    pub fn subscribe_mode(&self) -> StateSubscription<TrackingMode> {
        self.inner.mode.subscribe()
    }

    pub fn subscribe_availability(&self) -> StateSubscription<bool> {
        self.inner.monitor.availability().subscribe()
    }

    /// Whether the location-service monitor is currently probing.
    pub fn monitor_running(&self) -> bool {
        self.inner.monitor.is_running()
    }
}

impl<P, S, N> EngineInner<P, S, N>
where
    P: LocationPlatform,
    S: KeyValueStore,
    N: Notifier,
{
    async fn start_tracking(&self) -> Result<TrackingMode, TrackingError> {
        let mut machine = self.machine.lock().await;
        self.write_settings(|s| s.tracking_enabled = true).await;
        self.activate(&mut machine).await
    }

    async fn stop_tracking(&self) {
        let mut machine = self.machine.lock().await;
        self.write_settings(|s| s.tracking_enabled = false).await;
        self.deactivate(&mut machine).await;
    }

    /// StartTracking transition plus its side effects.
    async fn activate(
        &self,
        machine: &mut TrackingStateMachine<P>,
    ) -> Result<TrackingMode, TrackingError> {
        let was_active = machine.mode().is_active();
        let settings = self.settings.get();

        match machine.start(&settings).await {
            Ok(mode) => {
                if !was_active {
                    let mut recorder = self.recorder.lock().await;
                    recorder.stats.on_tracking_start(now_ms());
                    self.stats.publish(recorder.stats.stats().clone());
                    if settings.notify {
                        self.notifier.set_tracking_indicator(true).await;
                    }
                }
                Ok(mode)
            }
            Err(e) => {
                warn!(error = %e, "Failed to start tracking");
                match &e {
                    TrackingError::PermissionDenied => {
                        self.notifier
                            .notify(
                                "Permission Required",
                                "Location permission is required for tracking",
                            )
                            .await
                    }
                    _ => {
                        self.notifier
                            .notify("Tracking Error", "Failed to start location tracking")
                            .await
                    }
                }
                self.write_settings(|s| s.tracking_enabled = false).await;
                Err(e)
            }
        }
    }

    /// StopTracking transition plus its side effects.
    async fn deactivate(&self, machine: &mut TrackingStateMachine<P>) {
        let previous = machine.stop().await;
        if previous.is_active() {
            self.fold_session_time().await;
        }
        self.notifier.set_tracking_indicator(false).await;
    }

    async fn fold_session_time(&self) {
        let mut recorder = self.recorder.lock().await;
        recorder.stats.on_tracking_stop(now_ms());
        self.stats.publish(recorder.stats.stats().clone());
    }

    async fn handle_app_state(&self, is_active: bool) {
        let mut machine = self.machine.lock().await;
        let settings = self.settings.get();

        if is_active {
            if let Err(e) = machine.on_foregrounded(&settings).await {
                warn!(error = %e, "Failed to switch to foreground tracking");
                self.notifier
                    .notify("Tracking Error", "Failed to start location tracking")
                    .await;
            }
            self.monitor.resume();
        } else {
            if let Err(e) = machine.on_backgrounded(&settings).await {
                warn!(error = %e, "Failed to switch to background tracking");
                self.notifier
                    .notify("Tracking Error", "Failed to start background location tracking")
                    .await;
            }
            if !machine.mode().is_active() {
                self.monitor.pause();
            }
        }
        debug!(is_active, mode = %machine.mode(), "App state handled");
    }

    async fn update_settings(&self, patch: SettingsPatch) -> TrackSettings {
        if patch.is_empty() {
            return self.settings.get();
        }
        let mut machine = self.machine.lock().await;
        let (previous, updated) = self.write_settings(|s| *s = s.merged(&patch)).await;

        if previous.tracking_enabled != updated.tracking_enabled {
            if updated.tracking_enabled {
                // Failure is already surfaced and reverts the flag
                let _ = self.activate(&mut machine).await;
            } else {
                self.deactivate(&mut machine).await;
            }
        }
        self.settings.get()
    }

    /// Apply `f` to the settings, publish and persist. Returns the settings
    /// before and after.
    async fn write_settings(
        &self,
        f: impl FnOnce(&mut TrackSettings) + Send,
    ) -> (TrackSettings, TrackSettings) {
        let _guard = self.settings_write.lock().await;
        let (previous, updated) = self.settings.update(|s| {
            let previous = s.clone();
            f(s);
            (previous, s.clone())
        });
        if let Err(e) = save_settings(&self.store, &updated).await {
            warn!(error = %e, "Failed to persist settings");
        }
        (previous, updated)
    }

    async fn clear_history(&self) {
        let mut recorder = self.recorder.lock().await;
        recorder.history.clear();
        recorder.stats.reset();
        self.history.publish(Arc::new(Vec::new()));
        self.stats.publish(recorder.stats.stats().clone());
        if let Err(e) = save_history(&self.store, &recorder.history).await {
            warn!(error = %e, "Failed to persist cleared history");
        }
        info!("Location history cleared");
    }

    async fn current_position(&self) -> Result<LocationFix, TrackingError> {
        let options = PositionOptions {
            high_accuracy: self.settings.with(|s| s.accuracy_tier.wants_high_accuracy()),
            timeout: self.config.watch_timeout,
        };
        let request = self.platform.get_once(options);
        let result = match tokio::time::timeout(self.config.watch_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TrackingError::RequestTimeout {
                timeout_ms: self.config.watch_timeout.as_millis() as u64,
            }),
        };

        if let Err(e) = &result {
            warn!(error = %e, "Current position request failed");
            if let Some((title, body)) = e.alert() {
                self.notifier.notify(title, body).await;
            }
        }
        result
    }

    /// Run one fix through the filter and record it when accepted.
    ///
    /// Fixes arriving while idle come from a watcher that could not be
    /// removed and are dropped.
    async fn record_fix(&self, fix: LocationFix) {
        if !self.mode.get().is_active() {
            debug!(source = %fix.source, "Fix dropped while idle");
            return;
        }
        let settings = self.settings.get();
        let mut recorder = self.recorder.lock().await;
        let decision = recorder
            .filter
            .evaluate(recorder.history.last(), &fix, &settings);

        let distance_m = match decision {
            FilterDecision::Reject { reason, distance_m } => {
                debug!(?reason, distance_m, source = %fix.source, "Fix rejected");
                return;
            }
            FilterDecision::AcceptOrigin => 0.0,
            FilterDecision::Accept { distance_m } => distance_m,
        };

        debug!(
            distance_m,
            accuracy_m = fix.accuracy_meters,
            source = %fix.source,
            "Fix accepted"
        );
        recorder.stats.on_accept(&fix, distance_m);
        recorder.history.push(fix);

        self.history.publish(Arc::new(recorder.history.clone()));
        self.stats.publish(recorder.stats.stats().clone());
        if let Err(e) = save_history(&self.store, &recorder.history).await {
            warn!(error = %e, "Failed to persist location history");
        }
    }

    /// Error reported by a registered watcher.
    async fn handle_source_error(&self, error: TrackingError) {
        if !error.is_permission_denied() {
            warn!(error = %error, "Location watcher error");
            if let Some((title, body)) = error.alert() {
                self.notifier.notify(title, body).await;
            }
            return;
        }

        // Every live watcher reports the revocation; only the first stops
        let mut machine = self.machine.lock().await;
        if !machine.on_permission_revoked().await {
            debug!("Permission error after tracking stopped");
            return;
        }
        self.fold_session_time().await;
        self.notifier.set_tracking_indicator(false).await;
        self.write_settings(|s| s.tracking_enabled = false).await;
        self.notifier
            .notify("Permission Error", "Location permission denied. Please enable in settings.")
            .await;
    }

    async fn shutdown(&self) {
        info!("Tracking engine shutting down");
        self.cancellation.cancel();
        self.monitor.pause();

        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Engine task ended abnormally");
            }
        }

        self.machine.lock().await.stop().await;
    }

    async fn dispatch(&self, event: FixEvent) {
        match event {
            FixEvent::Fix(fix) => self.record_fix(fix).await,
            FixEvent::Error(error) => self.handle_source_error(error).await,
        }
    }
}

async fn run_fix_pipeline<P, S, N>(
    engine: Weak<EngineInner<P, S, N>>,
    mut fixes: mpsc::UnboundedReceiver<FixEvent>,
    mut flush_requests: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    cancellation: CancellationToken,
) where
    P: LocationPlatform,
    S: KeyValueStore,
    N: Notifier,
{
    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,

            event = fixes.recv() => {
                let Some(event) = event else { break };
                let Some(engine) = engine.upgrade() else { break };
                engine.dispatch(event).await;
            }

            Some(ack) = flush_requests.recv() => {
                let Some(engine) = engine.upgrade() else { break };
                while let Ok(event) = fixes.try_recv() {
                    engine.dispatch(event).await;
                }
                let _ = ack.send(());
            }
        }
    }
    debug!("Fix pipeline stopped");
}

async fn run_lifecycle<P, S, N>(
    engine: Weak<EngineInner<P, S, N>>,
    mut events: broadcast::Receiver<bool>,
    cancellation: CancellationToken,
) where
    P: LocationPlatform,
    S: KeyValueStore,
    N: Notifier,
{
    loop {
        let is_active = tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,
            event = events.recv() => match event {
                Ok(is_active) => is_active,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Lifecycle events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.handle_app_state(is_active).await;
    }
    debug!("Lifecycle listener stopped");
}
