//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::ValueEnum;
use fixtrail::config::ConfigFile;
use fixtrail::time::{format_hms, format_timestamp};
use fixtrail::tracking::{AccuracyTier, JsonFileStore, TrackSettings, TrackStats};

/// Accuracy tier selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AccuracyArg {
    /// GPS-grade fixes
    High,
    /// Balanced power and accuracy
    Medium,
    /// Coarse, low-power fixes
    Low,
}

impl From<AccuracyArg> for AccuracyTier {
    fn from(arg: AccuracyArg) -> Self {
        match arg {
            AccuracyArg::High => AccuracyTier::High,
            AccuracyArg::Medium => AccuracyTier::Medium,
            AccuracyArg::Low => AccuracyTier::Low,
        }
    }
}

/// Open the JSON store at `store_override`, or at the configured directory.
pub fn open_store(config: &ConfigFile, store_override: Option<&Path>) -> JsonFileStore {
    match store_override {
        Some(dir) => JsonFileStore::new(dir),
        None => JsonFileStore::new(&config.storage.directory),
    }
}

/// Format a distance as meters below one kilometer, kilometers above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Format a speed in meters per second as km/h.
pub fn format_speed(mps: f64) -> String {
    format!("{:.1} km/h", mps * 3.6)
}

/// Print trip statistics.
pub fn print_stats(stats: &TrackStats, points: usize) {
    println!("  Points:        {}", points);
    println!("  Distance:      {}", format_distance(stats.total_distance_meters));
    println!("  Time:          {}", format_hms(stats.total_time_seconds));
    match stats.average_speed_mps() {
        Some(speed) => println!("  Average speed: {}", format_speed(speed)),
        None => println!("  Average speed: -"),
    }
    if let Some(start) = stats.start_timestamp_ms.and_then(format_timestamp) {
        println!("  Started:       {}", start);
    }
    if let Some(end) = stats.end_timestamp_ms.and_then(format_timestamp) {
        println!("  Ended:         {}", end);
    }
}

/// Print tracking settings.
pub fn print_settings(settings: &TrackSettings) {
    println!("  Tracking enabled:    {}", settings.tracking_enabled);
    println!("  Background tracking: {}", settings.background_tracking_enabled);
    println!("  Notifications:       {}", settings.notify);
    println!("  Accuracy:            {}", settings.accuracy_tier);
    println!("  Minimum radius:      {}", format_distance(settings.min_radius_meters));
    println!("  Interval:            {} s", settings.tracking_interval_secs);
    match settings.reference_point {
        Some(point) => println!(
            "  Reference point:     {:.6}, {:.6}",
            point.latitude, point.longitude
        ),
        None => println!("  Reference point:     (not set)"),
    }
}
