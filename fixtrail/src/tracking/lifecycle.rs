//! App foreground/background signal.

use tokio::sync::broadcast;
use tracing::debug;

const LIFECYCLE_CHANNEL_CAPACITY: usize = 16;

/// Source of app-state changes. `true` means the app became active.
pub trait AppLifecycle {
    fn subscribe(&self) -> broadcast::Receiver<bool>;
}

/// Broadcast hub the host drives with [`LifecycleHub::set_active`].
#[derive(Debug, Clone)]
pub struct LifecycleHub {
    tx: broadcast::Sender<bool>,
}

impl LifecycleHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Report a foreground (`true`) or background (`false`) transition.
    ///
    /// Returns the number of listeners that will see it.
    pub fn set_active(&self, active: bool) -> usize {
        let receivers = self.tx.send(active).unwrap_or(0);
        debug!(active, receivers, "App state change");
        receivers
    }
}

impl Default for LifecycleHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AppLifecycle for LifecycleHub {
    fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_delivers_in_order() {
        let hub = LifecycleHub::new();
        assert_eq!(hub.set_active(false), 0);

        let mut rx = hub.subscribe();
        hub.set_active(false);
        hub.set_active(true);

        assert!(!rx.recv().await.unwrap());
        assert!(rx.recv().await.unwrap());
    }
}
