//! User-visible alerts and the persistent "tracking active" indicator.

use std::future::Future;
use std::sync::Mutex;

use tracing::{info, warn};

/// Sink for user notifications.
///
/// Implementations swallow their own delivery failures; a lost alert never
/// affects tracking.
pub trait Notifier: Send + Sync + 'static {
    /// Show a one-off alert.
    fn notify(&self, title: &str, body: &str) -> impl Future<Output = ()> + Send;

    /// Show or hide the ongoing tracking indicator.
    fn set_tracking_indicator(&self, active: bool) -> impl Future<Output = ()> + Send;
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        warn!(title = %title, body = %body, "User alert");
    }

    async fn set_tracking_indicator(&self, active: bool) {
        info!(active, "Tracking indicator");
    }
}

/// A recorded alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Notifier that keeps everything it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Notification>>,
    indicator: Mutex<Vec<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts shown so far, oldest first.
    pub fn alerts(&self) -> Vec<Notification> {
        self.alerts.lock().unwrap().clone()
    }

    /// Number of alerts with the given title.
    pub fn count_titled(&self, title: &str) -> usize {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.title == title)
            .count()
    }

    /// Every indicator change, oldest first.
    pub fn indicator_changes(&self) -> Vec<bool> {
        self.indicator.lock().unwrap().clone()
    }

    /// Whether the indicator is currently shown.
    pub fn indicator_active(&self) -> bool {
        self.indicator.lock().unwrap().last().copied().unwrap_or(false)
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        self.alerts.lock().unwrap().push(Notification {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    async fn set_tracking_indicator(&self, active: bool) {
        self.indicator.lock().unwrap().push(active);
    }
}
