//! User-facing tracking settings.
//!
//! [`TrackSettings`] is persisted under the `locationSettings` store key. The
//! stored record uses flat keys (`referenceLatitude`/`referenceLongitude`),
//! so (de)serialization goes through [`SettingsRecord`]. Every field falls
//! back to its default when missing, which is how loaded settings are merged
//! over defaults.

use serde::{Deserialize, Serialize};

use super::fix::Coordinate;

/// Default minimum radius between recorded fixes, in meters.
pub const DEFAULT_MIN_RADIUS_METERS: f64 = 10.0;

/// Default nominal tracking interval, in seconds.
pub const DEFAULT_TRACKING_INTERVAL_SECS: u32 = 10;

/// Requested positioning accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    Medium,
    Low,
    /// GPS-grade accuracy. Unknown stored values also decode as `High`.
    #[default]
    #[serde(other)]
    High,
}

impl AccuracyTier {
    /// Whether the platform should be asked for high-accuracy fixes.
    #[inline]
    pub fn wants_high_accuracy(&self) -> bool {
        matches!(self, Self::High)
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for AccuracyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!(
                "unknown accuracy tier '{}' (expected high, medium or low)",
                other
            )),
        }
    }
}

/// Tracking settings owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SettingsRecord", into = "SettingsRecord")]
pub struct TrackSettings {
    /// Whether the user has tracking switched on.
    pub tracking_enabled: bool,

    /// Whether tracking continues while the app is suspended.
    pub background_tracking_enabled: bool,

    /// Whether alerts and the ongoing tracking indicator are shown.
    pub notify: bool,

    /// Requested accuracy tier.
    pub accuracy_tier: AccuracyTier,

    /// Minimum distance between recorded fixes.
    pub min_radius_meters: f64,

    /// Nominal tracking interval (informational, the filter enforces its own cadence).
    pub tracking_interval_secs: u32,

    /// Optional user reference point.
    pub reference_point: Option<Coordinate>,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            tracking_enabled: false,
            background_tracking_enabled: false,
            notify: true,
            accuracy_tier: AccuracyTier::High,
            min_radius_meters: DEFAULT_MIN_RADIUS_METERS,
            tracking_interval_secs: DEFAULT_TRACKING_INTERVAL_SECS,
            reference_point: None,
        }
    }
}

impl TrackSettings {
    /// Distance filter handed to the background watcher.
    pub fn background_distance_filter(&self) -> f64 {
        self.min_radius_meters.max(10.0)
    }

    /// Returns a copy with `patch` applied.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.tracking_enabled {
            next.tracking_enabled = v;
        }
        if let Some(v) = patch.background_tracking_enabled {
            next.background_tracking_enabled = v;
        }
        if let Some(v) = patch.notify {
            next.notify = v;
        }
        if let Some(v) = patch.accuracy_tier {
            next.accuracy_tier = v;
        }
        if let Some(v) = patch.min_radius_meters {
            next.min_radius_meters = v;
        }
        if let Some(v) = patch.tracking_interval_secs {
            next.tracking_interval_secs = v;
        }
        match patch.reference_point {
            ReferenceUpdate::Unchanged => {}
            ReferenceUpdate::Set(point) => next.reference_point = Some(point),
            ReferenceUpdate::Clear => next.reference_point = None,
        }
        next
    }
}

/// How a [`SettingsPatch`] touches the reference point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReferenceUpdate {
    #[default]
    Unchanged,
    Set(Coordinate),
    Clear,
}

/// Partial settings update. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsPatch {
    pub tracking_enabled: Option<bool>,
    pub background_tracking_enabled: Option<bool>,
    pub notify: Option<bool>,
    pub accuracy_tier: Option<AccuracyTier>,
    pub min_radius_meters: Option<f64>,
    pub tracking_interval_secs: Option<u32>,
    pub reference_point: ReferenceUpdate,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Stored shape of [`TrackSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsRecord {
    is_tracking_enabled: bool,
    is_background_tracking_enabled: bool,
    show_notification: bool,
    tracking_interval: u32,
    location_accuracy: AccuracyTier,
    radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_longitude: Option<f64>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        TrackSettings::default().into()
    }
}

impl From<SettingsRecord> for TrackSettings {
    fn from(record: SettingsRecord) -> Self {
        let reference_point = match (record.reference_latitude, record.reference_longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };
        Self {
            tracking_enabled: record.is_tracking_enabled,
            background_tracking_enabled: record.is_background_tracking_enabled,
            notify: record.show_notification,
            accuracy_tier: record.location_accuracy,
            min_radius_meters: record.radius,
            tracking_interval_secs: record.tracking_interval,
            reference_point,
        }
    }
}

impl From<TrackSettings> for SettingsRecord {
    fn from(settings: TrackSettings) -> Self {
        Self {
            is_tracking_enabled: settings.tracking_enabled,
            is_background_tracking_enabled: settings.background_tracking_enabled,
            show_notification: settings.notify,
            tracking_interval: settings.tracking_interval_secs,
            location_accuracy: settings.accuracy_tier,
            radius: settings.min_radius_meters,
            reference_latitude: settings.reference_point.map(|p| p.latitude),
            reference_longitude: settings.reference_point.map(|p| p.longitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TrackSettings::default();
        assert!(!settings.tracking_enabled);
        assert!(!settings.background_tracking_enabled);
        assert!(settings.notify);
        assert_eq!(settings.accuracy_tier, AccuracyTier::High);
        assert_eq!(settings.min_radius_meters, 10.0);
        assert!(settings.reference_point.is_none());
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let json = r#"{"radius": 25, "isBackgroundTrackingEnabled": true}"#;
        let settings: TrackSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.min_radius_meters, 25.0);
        assert!(settings.background_tracking_enabled);
        assert!(settings.notify);
        assert_eq!(settings.accuracy_tier, AccuracyTier::High);
        assert_eq!(settings.tracking_interval_secs, 10);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"radius": 15, "theme": "dark"}"#;
        let settings: TrackSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.min_radius_meters, 15.0);
    }

    #[test]
    fn test_unknown_accuracy_decodes_as_high() {
        let json = r#"{"locationAccuracy": "extreme"}"#;
        let settings: TrackSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.accuracy_tier, AccuracyTier::High);
    }

    #[test]
    fn test_accuracy_tier_names() {
        assert_eq!(AccuracyTier::default(), AccuracyTier::High);
        for (tier, name) in [
            (AccuracyTier::High, "\"high\""),
            (AccuracyTier::Medium, "\"medium\""),
            (AccuracyTier::Low, "\"low\""),
        ] {
            assert_eq!(serde_json::to_string(&tier).unwrap(), name);
            assert_eq!(serde_json::from_str::<AccuracyTier>(name).unwrap(), tier);
        }
    }

    #[test]
    fn test_reference_point_needs_both_coordinates() {
        let json = r#"{"referenceLatitude": 43.6}"#;
        let settings: TrackSettings = serde_json::from_str(json).unwrap();
        assert!(settings.reference_point.is_none());

        let json = r#"{"referenceLatitude": 43.6, "referenceLongitude": 1.4}"#;
        let settings: TrackSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.reference_point, Some(Coordinate::new(43.6, 1.4)));
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let settings = TrackSettings {
            tracking_enabled: true,
            background_tracking_enabled: true,
            notify: false,
            accuracy_tier: AccuracyTier::Low,
            min_radius_meters: 42.5,
            tracking_interval_secs: 30,
            reference_point: Some(Coordinate::new(-33.9, 151.2)),
        };

        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: TrackSettings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn test_stored_key_names() {
        let json = serde_json::to_value(TrackSettings::default()).unwrap();
        assert_eq!(json["isTrackingEnabled"], false);
        assert_eq!(json["showNotification"], true);
        assert_eq!(json["locationAccuracy"], "high");
        assert_eq!(json["radius"], 10.0);
        assert!(json.get("referenceLatitude").is_none());
    }

    #[test]
    fn test_merge_patch() {
        let settings = TrackSettings {
            reference_point: Some(Coordinate::new(1.0, 2.0)),
            ..Default::default()
        };
        let patch = SettingsPatch {
            min_radius_meters: Some(50.0),
            accuracy_tier: Some(AccuracyTier::Medium),
            ..Default::default()
        };

        let merged = settings.merged(&patch);
        assert_eq!(merged.min_radius_meters, 50.0);
        assert_eq!(merged.accuracy_tier, AccuracyTier::Medium);
        assert_eq!(merged.reference_point, Some(Coordinate::new(1.0, 2.0)));

        let cleared = merged.merged(&SettingsPatch {
            reference_point: ReferenceUpdate::Clear,
            ..Default::default()
        });
        assert!(cleared.reference_point.is_none());
    }

    #[test]
    fn test_background_distance_filter_floor() {
        let mut settings = TrackSettings::default();
        settings.min_radius_meters = 3.0;
        assert_eq!(settings.background_distance_filter(), 10.0);
        settings.min_radius_meters = 25.0;
        assert_eq!(settings.background_distance_filter(), 25.0);
    }

    #[test]
    fn test_accuracy_tier_from_str() {
        assert_eq!("Medium".parse::<AccuracyTier>(), Ok(AccuracyTier::Medium));
        assert!("ultra".parse::<AccuracyTier>().is_err());
    }
}
