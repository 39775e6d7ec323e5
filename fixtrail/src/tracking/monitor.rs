//! Location-service availability monitor.
//!
//! Probes the platform with a cheap single-shot position request on a fixed
//! interval and publishes availability through a [`StateCache<bool>`]. Only
//! edges are published, and each available → unavailable edge raises one
//! user alert no matter how many probes keep failing afterwards.
//!
//! Probe interpretation:
//!
//! | Probe result            | Outcome       |
//! |-------------------------|---------------|
//! | position                | available     |
//! | `PositionUnavailable`   | unavailable   |
//! | `PermissionDenied`      | available (services are on, app lacks access) |
//! | timeout / other error   | inconclusive (no change) |

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::TrackingError;
use super::notifier::Notifier;
use super::platform::{LocationPlatform, PositionOptions};
use super::state_cache::StateCache;

/// Default time between probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(5_000);

/// Default deadline for a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Monitor timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Interpretation of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Available,
    Unavailable,
    Inconclusive,
}

struct Prober<P, N> {
    platform: Arc<P>,
    notifier: Arc<N>,
    availability: StateCache<bool>,
    config: MonitorConfig,
}

impl<P: LocationPlatform, N: Notifier> Prober<P, N> {
    async fn probe(&self) -> ProbeOutcome {
        let request = self
            .platform
            .get_once(PositionOptions::probe(self.config.probe_timeout));

        match tokio::time::timeout(self.config.probe_timeout, request).await {
            Ok(Ok(_)) => ProbeOutcome::Available,
            Ok(Err(TrackingError::PositionUnavailable)) => ProbeOutcome::Unavailable,
            Ok(Err(TrackingError::PermissionDenied)) => ProbeOutcome::Available,
            Ok(Err(e)) => {
                debug!(error = %e, "Location probe inconclusive");
                ProbeOutcome::Inconclusive
            }
            Err(_) => {
                debug!(
                    timeout_ms = self.config.probe_timeout.as_millis() as u64,
                    "Location probe timed out"
                );
                ProbeOutcome::Inconclusive
            }
        }
    }

    /// Probe once and publish an edge if availability changed.
    async fn check(&self) -> ProbeOutcome {
        let outcome = self.probe().await;
        let available = match outcome {
            ProbeOutcome::Available => true,
            ProbeOutcome::Unavailable => false,
            ProbeOutcome::Inconclusive => return outcome,
        };

        match self.availability.publish_if_changed(available) {
            Some(true) => {
                warn!("Location services became unavailable");
                if let Some((title, body)) = TrackingError::PositionUnavailable.alert() {
                    self.notifier.notify(title, body).await;
                }
            }
            Some(false) => info!("Location services available again"),
            None => {}
        }
        outcome
    }
}

async fn run_probes<P: LocationPlatform, N: Notifier>(
    prober: Arc<Prober<P, N>>,
    cancellation: CancellationToken,
) {
    let mut ticker = interval(prober.config.probe_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => {
                debug!("Location monitor paused");
                break;
            }

            _ = ticker.tick() => {
                prober.check().await;
            }
        }
    }
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic location-service probe with pause/resume.
pub struct LocationServiceMonitor<P, N> {
    prober: Arc<Prober<P, N>>,
    parent: CancellationToken,
    running: Mutex<Option<Running>>,
}

impl<P: LocationPlatform, N: Notifier> LocationServiceMonitor<P, N> {
    /// Create a paused monitor. Availability starts `true`.
    ///
    /// Cancelling `parent` stops the probe loop for good.
    pub fn new(
        platform: Arc<P>,
        notifier: Arc<N>,
        config: MonitorConfig,
        parent: CancellationToken,
    ) -> Self {
        Self {
            prober: Arc::new(Prober {
                platform,
                notifier,
                availability: StateCache::new(true),
                config,
            }),
            parent,
            running: Mutex::new(None),
        }
    }

    /// Availability publish point.
    pub fn availability(&self) -> &StateCache<bool> {
        &self.prober.availability
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Start probing (first probe immediately). No-op when running.
    pub fn resume(&self) {
        let mut running = self.running.lock().unwrap();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }
        if self.parent.is_cancelled() {
            return;
        }

        let token = self.parent.child_token();
        let handle = tokio::spawn(run_probes(Arc::clone(&self.prober), token.clone()));
        *running = Some(Running { token, handle });
        debug!(
            interval_ms = self.prober.config.probe_interval.as_millis() as u64,
            "Location monitor resumed"
        );
    }

    /// Stop probing. The last published availability is kept.
    pub fn pause(&self) {
        if let Some(running) = self.running.lock().unwrap().take() {
            running.token.cancel();
        }
    }

    /// Probe once outside the schedule.
    pub async fn check_now(&self) -> ProbeOutcome {
        self.prober.check().await
    }
}

impl<P, N> Drop for LocationServiceMonitor<P, N> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            if let Some(running) = running.take() {
                running.token.cancel();
            }
        }
    }
}
