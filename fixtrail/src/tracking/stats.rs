//! Trip statistics.
//!
//! [`TrackStats`] is always derivable from History: [`StatsAggregator::on_accept`]
//! accumulates it incrementally as fixes are recorded, and
//! [`StatsAggregator::recompute_from_history`] rebuilds it from a stored
//! sequence. Both sum the same haversine distances in the same order, so
//! they agree to the bit.

use serde::{Deserialize, Serialize};

use super::fix::LocationFix;
use super::geo::fix_distance_m;

/// Distance and elapsed time over the recorded trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    #[serde(rename = "totalDistance")]
    pub total_distance_meters: f64,

    #[serde(rename = "totalTime")]
    pub total_time_seconds: f64,

    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp_ms: Option<i64>,

    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp_ms: Option<i64>,
}

impl TrackStats {
    /// Average speed over the trip in meters per second.
    pub fn average_speed_mps(&self) -> Option<f64> {
        (self.total_time_seconds > 0.0)
            .then(|| self.total_distance_meters / self.total_time_seconds)
    }
}

/// Incremental stats accumulator.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    stats: TrackStats,
    /// Set once the first fix of the history has been seen.
    has_origin: bool,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stats snapshot.
    pub fn stats(&self) -> &TrackStats {
        &self.stats
    }

    /// Rebuild stats by replaying `history`.
    pub fn recompute_from_history(history: &[LocationFix]) -> Self {
        let mut aggregator = Self::new();
        let mut previous: Option<&LocationFix> = None;
        for fix in history {
            let distance = previous.map_or(0.0, |prev| fix_distance_m(prev, fix));
            aggregator.on_accept(fix, distance);
            previous = Some(fix);
        }
        aggregator
    }

    /// Fold an accepted fix into the stats.
    ///
    /// `distance_m` is the filter's distance from the previous accepted fix
    /// and is ignored for the first fix.
    pub fn on_accept(&mut self, fix: &LocationFix, distance_m: f64) {
        if !self.has_origin {
            self.has_origin = true;
            self.stats.start_timestamp_ms = Some(fix.timestamp_ms);
            self.stats.end_timestamp_ms = Some(fix.timestamp_ms);
            self.stats.total_time_seconds = 0.0;
            return;
        }

        self.stats.total_distance_meters += distance_m;
        self.stats.end_timestamp_ms = Some(fix.timestamp_ms);
        self.refresh_total_time();
    }

    /// Mark the start of a tracking session.
    ///
    /// Only fills in a provisional start when none exists; the first
    /// recorded fix replaces it.
    pub fn on_tracking_start(&mut self, now_ms: i64) {
        if self.stats.start_timestamp_ms.is_none() {
            self.stats.start_timestamp_ms = Some(now_ms);
        }
    }

    /// Fold wall-clock tracking time up to `now_ms` into the total.
    pub fn on_tracking_stop(&mut self, now_ms: i64) {
        if self.stats.start_timestamp_ms.is_none() {
            return;
        }
        let end = self.stats.end_timestamp_ms.map_or(now_ms, |end| end.max(now_ms));
        self.stats.end_timestamp_ms = Some(end);
        self.refresh_total_time();
    }

    /// Zero everything (history was cleared).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn refresh_total_time(&mut self) {
        let stats = &mut self.stats;
        if let (Some(start), Some(end)) = (stats.start_timestamp_ms, stats.end_timestamp_ms) {
            stats.total_time_seconds = (end - start) as f64 / 1000.0;
        }
    }
}
