//! Scripted location platform.
//!
//! [`ReplayPlatform`] implements [`LocationPlatform`] entirely in memory.
//! The host drives it: [`ReplayPlatform::emit`] pushes a fix to every
//! registered watcher, [`ReplayPlatform::revoke_permission`] reports a
//! permission loss, and [`ReplayPlatform::set_services_enabled`] switches the
//! single-shot probe between success and `PositionUnavailable`. Registration
//! and removal failures can be injected per watcher kind, and
//! [`ReplayPlatform::set_yielding`] makes every permission and watcher call
//! yield to the scheduler first. Every call the engine makes is logged for
//! assertions.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::error::TrackingError;
use super::fix::{FixSource, LocationFix};
use super::platform::{
    BackgroundWatchOptions, FixEvent, FixSink, LocationPlatform, PositionOptions, WatchId,
};

/// A call made against the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    CheckPermission,
    RequestPermission,
    GetOnce { high_accuracy: bool },
    Watch { id: WatchId, high_accuracy: bool },
    Unwatch { id: WatchId },
    AddBackgroundWatcher { id: WatchId, distance_filter_meters: f64 },
    RemoveBackgroundWatcher { id: WatchId },
}

#[derive(Default)]
struct ReplayState {
    permission_granted: bool,
    grant_on_request: bool,
    services_enabled: bool,
    next_id: u64,
    watchers: BTreeMap<WatchId, (FixSource, FixSink)>,
    fail_registration: Vec<FixSource>,
    fail_removal: Vec<FixSource>,
    yielding: bool,
    last_fix: Option<LocationFix>,
    calls: Vec<PlatformCall>,
}

impl ReplayState {
    fn allocate(&mut self, kind: FixSource) -> WatchId {
        self.next_id += 1;
        let prefix = if kind.is_background() { "bg" } else { "fg" };
        WatchId(format!("{}-{}", prefix, self.next_id))
    }

    fn count(&self, kind: FixSource) -> usize {
        self.watchers.values().filter(|(k, _)| *k == kind).count()
    }
}

/// Consume a pending injected failure for `kind`.
fn take_failure(pending: &mut Vec<FixSource>, kind: FixSource) -> bool {
    match pending.iter().position(|k| *k == kind) {
        Some(index) => {
            pending.remove(index);
            true
        }
        None => false,
    }
}

/// In-memory [`LocationPlatform`] driven by the caller.
pub struct ReplayPlatform {
    state: Mutex<ReplayState>,
}

impl ReplayPlatform {
    /// Permission granted, services on, no watchers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReplayState {
                permission_granted: true,
                grant_on_request: true,
                services_enabled: true,
                ..Default::default()
            }),
        }
    }

    /// Set the current permission and what a permission request answers.
    pub fn set_permission(&self, granted: bool, grant_on_request: bool) {
        let mut state = self.state.lock().unwrap();
        state.permission_granted = granted;
        state.grant_on_request = grant_on_request;
    }

    /// Switch the device location subsystem on or off.
    pub fn set_services_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().services_enabled = enabled;
    }

    /// Make the next registration of `kind` fail.
    pub fn fail_next_registration(&self, kind: FixSource) {
        self.state.lock().unwrap().fail_registration.push(kind);
    }

    /// Yield to the scheduler at the start of every permission and watcher
    /// call, so concurrent engine commands interleave.
    pub fn set_yielding(&self, yielding: bool) {
        self.state.lock().unwrap().yielding = yielding;
    }

    /// Make the next removal of a `kind` watcher fail. The watcher stays
    /// registered.
    pub fn fail_next_removal(&self, kind: FixSource) {
        self.state.lock().unwrap().fail_removal.push(kind);
    }

    /// Deliver `fix` to every registered watcher, tagged with the
    /// watcher's kind. Returns the number of deliveries.
    pub fn emit(&self, fix: LocationFix) -> usize {
        let mut state = self.state.lock().unwrap();
        state.last_fix = Some(fix.clone());
        state
            .watchers
            .values()
            .filter(|(kind, sink)| {
                sink.send(FixEvent::Fix(fix.clone().with_source(*kind)))
                    .is_ok()
            })
            .count()
    }

    /// Withdraw permission and report it through every watcher.
    pub fn revoke_permission(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.permission_granted = false;
        state.grant_on_request = false;
        state
            .watchers
            .values()
            .filter(|(_, sink)| sink.send(FixEvent::Error(TrackingError::PermissionDenied)).is_ok())
            .count()
    }

    /// Number of registered foreground watchers.
    pub fn active_foreground(&self) -> usize {
        self.state.lock().unwrap().count(FixSource::Foreground)
    }

    /// Number of registered background watchers.
    pub fn active_background(&self) -> usize {
        self.state.lock().unwrap().count(FixSource::Background)
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().unwrap().calls.clone()
    }

    async fn yield_point(&self) {
        let yielding = self.state.lock().unwrap().yielding;
        if yielding {
            tokio::task::yield_now().await;
        }
    }

    fn register(&self, kind: FixSource, sink: FixSink) -> Result<WatchId, TrackingError> {
        let mut state = self.state.lock().unwrap();
        if take_failure(&mut state.fail_registration, kind) {
            return Err(TrackingError::Platform(format!("{} watcher unavailable", kind)));
        }
        if kind.is_background() && !state.permission_granted {
            // Background registration asks for permission itself
            if !state.grant_on_request {
                return Err(TrackingError::PermissionDenied);
            }
            state.permission_granted = true;
        }
        let id = state.allocate(kind);
        state.watchers.insert(id.clone(), (kind, sink));
        Ok(id)
    }

    fn remove(&self, kind: FixSource, id: &WatchId) -> Result<(), TrackingError> {
        let mut state = self.state.lock().unwrap();
        if take_failure(&mut state.fail_removal, kind) {
            return Err(TrackingError::Platform(format!("{} watcher '{}' is busy", kind, id)));
        }
        match state.watchers.get(id) {
            Some((k, _)) if *k == kind => {
                state.watchers.remove(id);
                Ok(())
            }
            _ => Err(TrackingError::Platform(format!("no {} watcher '{}'", kind, id))),
        }
    }
}

impl Default for ReplayPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationPlatform for ReplayPlatform {
    async fn check_permission(&self) -> Result<bool, TrackingError> {
        self.yield_point().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlatformCall::CheckPermission);
        Ok(state.permission_granted)
    }

    async fn request_permission(&self) -> Result<bool, TrackingError> {
        self.yield_point().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlatformCall::RequestPermission);
        if state.grant_on_request {
            state.permission_granted = true;
        }
        Ok(state.permission_granted)
    }

    async fn get_once(&self, options: PositionOptions) -> Result<LocationFix, TrackingError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlatformCall::GetOnce {
            high_accuracy: options.high_accuracy,
        });
        if !state.permission_granted {
            return Err(TrackingError::PermissionDenied);
        }
        if !state.services_enabled {
            return Err(TrackingError::PositionUnavailable);
        }
        Ok(state
            .last_fix
            .clone()
            .unwrap_or_else(|| LocationFix::new(0.0, 0.0, 0.0, 0)))
    }

    async fn watch(
        &self,
        options: PositionOptions,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError> {
        self.yield_point().await;
        let id = self.register(FixSource::Foreground, sink)?;
        self.state.lock().unwrap().calls.push(PlatformCall::Watch {
            id: id.clone(),
            high_accuracy: options.high_accuracy,
        });
        Ok(id)
    }

    async fn unwatch(&self, id: &WatchId) -> Result<(), TrackingError> {
        self.yield_point().await;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(PlatformCall::Unwatch { id: id.clone() });
        self.remove(FixSource::Foreground, id)
    }

    async fn add_background_watcher(
        &self,
        options: BackgroundWatchOptions,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError> {
        self.yield_point().await;
        let id = self.register(FixSource::Background, sink)?;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(PlatformCall::AddBackgroundWatcher {
                id: id.clone(),
                distance_filter_meters: options.distance_filter_meters,
            });
        Ok(id)
    }

    async fn remove_background_watcher(&self, id: &WatchId) -> Result<(), TrackingError> {
        self.yield_point().await;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(PlatformCall::RemoveBackgroundWatcher { id: id.clone() });
        self.remove(FixSource::Background, id)
    }
}
