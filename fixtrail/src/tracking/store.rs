//! Key-value persistence for settings and history.
//!
//! The engine only needs string get/set on two keys:
//!
//! - [`SETTINGS_KEY`] → JSON-encoded [`TrackSettings`]
//! - [`HISTORY_KEY`] → JSON-encoded `Vec<LocationFix>`
//!
//! [`KeyValueStore`] is the collaborator contract. Two implementations are
//! provided: [`MemoryStore`] (tests, failure injection) and [`JsonFileStore`]
//! (one `<key>.json` file per key in a directory).

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::fix::LocationFix;
use super::settings::TrackSettings;

/// Store key for tracking settings.
pub const SETTINGS_KEY: &str = "locationSettings";

/// Store key for location history.
pub const HISTORY_KEY: &str = "locationHistory";

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored value could not be encoded or decoded.
    #[error("Invalid stored JSON for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Store rejected the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Async string key-value store.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

/// Load settings, merging stored fields over defaults.
pub async fn load_settings<S: KeyValueStore>(store: &S) -> Result<TrackSettings, StoreError> {
    match store.get(SETTINGS_KEY).await? {
        Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Serialization {
            key: SETTINGS_KEY.to_string(),
            source,
        }),
        None => Ok(TrackSettings::default()),
    }
}

/// Load history; a missing key is an empty history.
pub async fn load_history<S: KeyValueStore>(store: &S) -> Result<Vec<LocationFix>, StoreError> {
    match store.get(HISTORY_KEY).await? {
        Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Serialization {
            key: HISTORY_KEY.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Encode and store settings.
pub async fn save_settings<S: KeyValueStore>(
    store: &S,
    settings: &TrackSettings,
) -> Result<(), StoreError> {
    let json = encode(SETTINGS_KEY, settings)?;
    store.set(SETTINGS_KEY, json).await
}

/// Encode and store history.
pub async fn save_history<S: KeyValueStore>(
    store: &S,
    history: &[LocationFix],
) -> Result<(), StoreError> {
    let json = encode(HISTORY_KEY, history)?;
    store.set(HISTORY_KEY, json).await
}

pub(crate) fn encode<T: serde::Serialize + ?Sized>(
    key: &str,
    value: &T,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}

/// In-memory store.
///
/// Writes can be made to fail with [`MemoryStore::fail_writes`] to exercise
/// the engine's storage-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(values),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Raw stored value, for assertions.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Unavailable(format!("write to '{}' rejected", key)));
        }
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Directory-backed store: each key lives in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        // Write-then-rename so a crash never leaves a truncated value
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::fix::{Coordinate, FixSource};
    use crate::tracking::settings::AccuracyTier;

    #[tokio::test]
    async fn test_missing_keys_load_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_settings(&store).await.unwrap(), TrackSettings::default());
        assert!(load_history(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings_merge_over_defaults() {
        let stored = r#"{"radius": 30, "showNotification": false}"#;
        let store = MemoryStore::with_entries([(SETTINGS_KEY, stored)]);
        let settings = load_settings(&store).await.unwrap();

        assert_eq!(settings.min_radius_meters, 30.0);
        assert!(!settings.notify);
        assert_eq!(settings.accuracy_tier, AccuracyTier::High);
    }

    #[tokio::test]
    async fn test_corrupt_history_is_an_error() {
        let store = MemoryStore::with_entries([(HISTORY_KEY, "not json")]);
        let err = load_history(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == HISTORY_KEY));
    }

    #[tokio::test]
    async fn test_failed_writes() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(save_settings(&store, &TrackSettings::default()).await.is_err());
        store.fail_writes(false);
        assert!(save_settings(&store, &TrackSettings::default()).await.is_ok());
        assert!(store.raw(SETTINGS_KEY).is_some());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("data"));

        let settings = TrackSettings {
            background_tracking_enabled: true,
            reference_point: Some(Coordinate::new(43.6, 1.4)),
            ..Default::default()
        };
        let history = vec![
            LocationFix::new(43.6, 1.4, 5.0, 1_000),
            LocationFix::new(43.601, 1.4, 8.0, 2_000).with_source(FixSource::Background),
        ];

        save_settings(&store, &settings).await.unwrap();
        save_history(&store, &history).await.unwrap();

        assert_eq!(load_settings(&store).await.unwrap(), settings);
        assert_eq!(load_history(&store).await.unwrap(), history);
        assert!(temp_dir.path().join("data").join("locationHistory.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_missing_dir_reads_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("absent"));
        assert_eq!(store.get(SETTINGS_KEY).await.unwrap(), None);
    }
}
