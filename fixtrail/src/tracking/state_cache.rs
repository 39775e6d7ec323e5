//! Hot-replay state cache.
//!
//! A [`StateCache`] holds the last published value plus the set of live
//! subscribers. A new [`StateSubscription`] receives the current value
//! first, then every later publish in publish order. Nothing is dropped:
//! each subscriber owns an unbounded queue, unlike `tokio::sync::watch`
//! (coalesces) or `broadcast` (lags).
//!
//! The current value can also be read synchronously with [`StateCache::get`].
//!
//! # Usage
//!
//! ```
//! use fixtrail::tracking::StateCache;
//!
//! let cache = StateCache::new(1u32);
//! let mut sub = cache.subscribe();
//! cache.publish(2);
//!
//! assert_eq!(sub.try_recv(), Some(1));
//! assert_eq!(sub.try_recv(), Some(2));
//! assert_eq!(cache.get(), 2);
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

struct Inner<T> {
    value: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Publish point with hot-replay semantics. Cloning shares the same state.
pub struct StateCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for StateCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> StateCache<T> {
    /// Create a cache holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.lock().unwrap().value.clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock().unwrap().value)
    }

    /// Subscribe; the current value is queued before any later publish.
    pub fn subscribe(&self) -> StateSubscription<T> {
        let mut inner = self.inner.lock().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail: the receiver is alive
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        StateSubscription { rx }
    }

    /// Replace the value and deliver it to every subscriber.
    pub fn publish(&self, value: T) {
        let mut inner = self.inner.lock().unwrap();
        inner.value = value;
        Self::deliver(&mut inner);
    }

    /// Mutate the value in place and publish the result.
    ///
    /// Read-modify-publish happens under one lock, so concurrent updates
    /// never lose each other's changes.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        let result = f(&mut inner.value);
        Self::deliver(&mut inner);
        result
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }

    fn deliver(inner: &mut Inner<T>) {
        let value = &inner.value;
        inner.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

impl<T: Clone + PartialEq + Send + 'static> StateCache<T> {
    /// Publish only when `value` differs from the current one.
    ///
    /// Returns the previous value when an edge was published.
    pub fn publish_if_changed(&self, value: T) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        if inner.value == value {
            return None;
        }
        let previous = std::mem::replace(&mut inner.value, value);
        Self::deliver(&mut inner);
        Some(previous)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.lock() {
            Ok(inner) => f
                .debug_struct("StateCache")
                .field("value", &inner.value)
                .field("subscribers", &inner.subscribers.len())
                .finish(),
            Err(_) => f.write_str("StateCache(<poisoned>)"),
        }
    }
}

/// Receiving end of a [`StateCache`] subscription.
pub struct StateSubscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> StateSubscription<T> {
    /// Next value; `None` once the cache has been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next queued value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued so far, returning the newest value.
    pub fn latest(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok(value) = self.rx.try_recv() {
            latest = Some(value);
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscriber_gets_current_value() {
        let cache = StateCache::new("a".to_string());
        cache.publish("b".to_string());

        let mut sub = cache.subscribe();
        assert_eq!(sub.try_recv().as_deref(), Some("b"));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_updates_arrive_in_publish_order() {
        let cache = StateCache::new(0);
        let mut early = cache.subscribe();
        for i in 1..=5 {
            cache.publish(i);
        }
        let mut late = cache.subscribe();
        cache.publish(6);

        let early_seen: Vec<_> = std::iter::from_fn(|| early.try_recv()).collect();
        let late_seen: Vec<_> = std::iter::from_fn(|| late.try_recv()).collect();
        assert_eq!(early_seen, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(late_seen, vec![5, 6]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let cache = StateCache::new(0);
        let sub = cache.subscribe();
        let _kept = cache.subscribe();
        assert_eq!(cache.subscriber_count(), 2);

        drop(sub);
        cache.publish(1);
        assert_eq!(cache.subscriber_count(), 1);
    }

    #[test]
    fn test_update_publishes_mutation() {
        let cache = StateCache::new(vec![1]);
        let mut sub = cache.subscribe();

        let len = cache.update(|v| {
            v.push(2);
            v.len()
        });

        assert_eq!(len, 2);
        assert_eq!(sub.latest(), Some(vec![1, 2]));
        assert_eq!(cache.get(), vec![1, 2]);
    }

    #[test]
    fn test_publish_if_changed_is_edge_triggered() {
        let cache = StateCache::new(true);
        let mut sub = cache.subscribe();
        assert_eq!(sub.try_recv(), Some(true));

        assert_eq!(cache.publish_if_changed(true), None);
        assert_eq!(cache.publish_if_changed(false), Some(true));
        assert_eq!(cache.publish_if_changed(false), None);

        assert_eq!(sub.try_recv(), Some(false));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_with_reads_in_place() {
        let cache = StateCache::new(vec![1, 2, 3]);
        assert_eq!(cache.with(|v| v.len()), 3);
    }

    #[tokio::test]
    async fn test_async_recv() {
        let cache = StateCache::new(0u8);
        let mut sub = cache.subscribe();
        let publisher = cache.clone();

        tokio::spawn(async move {
            publisher.publish(7);
        });

        assert_eq!(sub.recv().await, Some(0));
        assert_eq!(sub.recv().await, Some(7));
    }
}
