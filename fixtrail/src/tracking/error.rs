//! Error types for the tracking engine.

use thiserror::Error;

use super::fix::FixSource;
use super::store::StoreError;

/// Errors raised by platform calls, fix sources and persistence.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Location permission is missing or was revoked.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform location subsystem is switched off or has no fix.
    #[error("Position unavailable (location services disabled?)")]
    PositionUnavailable,

    /// A position request did not complete in time.
    #[error("Location request timed out after {timeout_ms}ms")]
    RequestTimeout { timeout_ms: u64 },

    /// A fix source could not be registered.
    #[error("Failed to register {source_kind} watcher: {reason}")]
    WatcherRegistration { source_kind: FixSource, reason: String },

    /// Reading or writing the key-value store failed.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    /// Any other platform failure.
    #[error("Platform error: {0}")]
    Platform(String),
}

impl TrackingError {
    /// Title and body of the user alert for this error.
    ///
    /// Storage failures are never surfaced to the user.
    pub fn alert(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::PermissionDenied => Some((
                "Location Permission Denied",
                "This app requires location permission to function properly.",
            )),
            Self::PositionUnavailable => Some((
                "Location Services Disabled",
                "Please enable location services in your device settings to use this app.",
            )),
            Self::RequestTimeout { .. } => Some((
                "Timeout Error",
                "Location request timed out. Please try again later.",
            )),
            Self::WatcherRegistration { .. } => {
                Some(("Tracking Error", "Failed to start location tracking"))
            }
            Self::Platform(_) => Some((
                "Location Error",
                "Unable to get current location. Please check your GPS settings.",
            )),
            Self::Storage(_) => None,
        }
    }

    /// Whether this error means the app lost its location permission.
    #[inline]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TrackingError::WatcherRegistration {
            source_kind: FixSource::Background,
            reason: "plugin missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to register Background watcher: plugin missing"
        );
        assert_eq!(
            TrackingError::RequestTimeout { timeout_ms: 3000 }.to_string(),
            "Location request timed out after 3000ms"
        );
    }

    #[test]
    fn test_alerts() {
        assert_eq!(
            TrackingError::PositionUnavailable.alert().map(|(t, _)| t),
            Some("Location Services Disabled")
        );
        assert_eq!(
            TrackingError::PermissionDenied.alert().map(|(t, _)| t),
            Some("Location Permission Denied")
        );
        let storage = TrackingError::from(StoreError::Unavailable("disk full".to_string()));
        assert!(storage.alert().is_none());
    }
}
