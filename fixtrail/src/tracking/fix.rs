//! Core position types for the tracking engine.
//!
//! - [`FixSource`] - Which watcher produced a fix
//! - [`LocationFix`] - A single reported device position
//! - [`Coordinate`] - A bare latitude/longitude pair (reference points)
//!
//! The serde representation of [`LocationFix`] is the record shape used by the
//! `locationHistory` store key, so persisted histories stay readable across
//! versions.

use serde::{Deserialize, Serialize};

/// Which fix source produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixSource {
    /// Foreground watcher (app active).
    #[default]
    Foreground,
    /// Coarse background watcher (app suspended).
    Background,
}

impl FixSource {
    /// Returns true for fixes obtained while the app was in background.
    #[inline]
    pub fn is_background(&self) -> bool {
        matches!(self, Self::Background)
    }
}

impl std::fmt::Display for FixSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "Foreground"),
            Self::Background => write!(f, "Background"),
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single reported device position.
///
/// Immutable once created: the filter and aggregator only ever read fixes,
/// and History stores them as accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,

    /// Horizontal accuracy radius in meters.
    #[serde(rename = "accuracy", default)]
    pub accuracy_meters: f64,

    /// Milliseconds since the Unix epoch, as reported by the platform.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,

    /// Ground speed in meters per second.
    #[serde(rename = "speed", default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,

    /// Altitude in meters.
    #[serde(rename = "altitude", default, skip_serializing_if = "Option::is_none")]
    pub altitude_meters: Option<f64>,

    /// Platform activity classification (walking, automotive, ...), if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,

    /// Which watcher produced this fix.
    #[serde(rename = "isBackgroundLocation", default, with = "source_flag")]
    pub source: FixSource,
}

impl LocationFix {
    /// Create a foreground fix with no optional fields.
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp_ms,
            speed_mps: None,
            altitude_meters: None,
            activity_type: None,
            source: FixSource::Foreground,
        }
    }

    /// Returns the same fix tagged with a different source.
    pub fn with_source(mut self, source: FixSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_altitude(mut self, altitude_meters: f64) -> Self {
        self.altitude_meters = Some(altitude_meters);
        self
    }

    /// Position as a [`Coordinate`].
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Stores [`FixSource`] as the boolean `isBackgroundLocation` flag.
mod source_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::FixSource;

    pub fn serialize<S: Serializer>(source: &FixSource, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(source.is_background())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixSource, D::Error> {
        let background = Option::<bool>::deserialize(deserializer)?.unwrap_or(false);
        Ok(if background {
            FixSource::Background
        } else {
            FixSource::Foreground
        })
    }
}
