//! Fix Filter - decides whether a raw fix is significant enough to record.
//!
//! # Rules
//!
//! Given the last accepted fix and a candidate:
//!
//! 1. No previous fix: always accept (origin of the trip).
//! 2. `distance >= min_radius_meters`
//! 3. `distance > max(last.accuracy, 5) + max(candidate.accuracy, 5)`
//! 4. `distance > 10` or more than 30 s since the last accepted fix
//!
//! Rules 2 and 3 suppress jitter smaller than the combined sensor error
//! budget. Rule 4 bounds silence to 30 s for slow but accurate movement.
//!
//! Candidates timestamped before the last accepted fix are handled by
//! [`StaleFixPolicy`].

use super::fix::LocationFix;
use super::geo::fix_distance_m;
use super::settings::TrackSettings;

/// Accuracy floor applied to each fix when building the jitter threshold.
pub const MIN_ACCURACY_BUDGET_M: f64 = 5.0;

/// Distance above which a fix counts as progress regardless of elapsed time.
pub const PROGRESS_DISTANCE_M: f64 = 10.0;

/// Maximum silence before a fix is recorded even without progress.
pub const MAX_SILENCE_MS: i64 = 30_000;

/// What to do with a candidate older than the last accepted fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleFixPolicy {
    /// Reject out-of-order fixes; History stays sorted by timestamp.
    #[default]
    Reject,
    /// Run the distance rules with the (negative) time difference as-is.
    Accept,
}

impl std::str::FromStr for StaleFixPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "accept" => Ok(Self::Accept),
            other => Err(format!("unknown stale fix policy '{}'", other)),
        }
    }
}

impl std::fmt::Display for StaleFixPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Accept => write!(f, "accept"),
        }
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Closer to the last fix than the configured radius.
    BelowMinRadius,
    /// Within the combined accuracy of both fixes.
    WithinAccuracy,
    /// Short hop that arrived within the silence window.
    NoProgress,
    /// Timestamp precedes the last accepted fix.
    OutOfOrder,
}

/// Outcome of evaluating a candidate fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDecision {
    /// First fix of an empty history.
    AcceptOrigin,
    /// Accepted; carries the distance from the last fix.
    Accept { distance_m: f64 },
    /// Rejected with the measured distance (zero for out-of-order fixes).
    Reject { reason: RejectReason, distance_m: f64 },
}

impl FilterDecision {
    #[inline]
    pub fn is_accept(&self) -> bool {
        !matches!(self, Self::Reject { .. })
    }

    /// Distance to add to the running total (zero for the origin).
    pub fn accepted_distance(&self) -> Option<f64> {
        match self {
            Self::AcceptOrigin => Some(0.0),
            Self::Accept { distance_m } => Some(*distance_m),
            Self::Reject { .. } => None,
        }
    }
}

/// Fix filter with a configurable out-of-order policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixFilter {
    stale_policy: StaleFixPolicy,
}

impl FixFilter {
    pub fn new(stale_policy: StaleFixPolicy) -> Self {
        Self { stale_policy }
    }

    pub fn stale_policy(&self) -> StaleFixPolicy {
        self.stale_policy
    }

    /// Evaluate `candidate` against the last accepted fix.
    pub fn evaluate(
        &self,
        last: Option<&LocationFix>,
        candidate: &LocationFix,
        settings: &TrackSettings,
    ) -> FilterDecision {
        let Some(last) = last else {
            return FilterDecision::AcceptOrigin;
        };

        let time_diff_ms = candidate.timestamp_ms - last.timestamp_ms;
        if time_diff_ms < 0 && self.stale_policy == StaleFixPolicy::Reject {
            return FilterDecision::Reject {
                reason: RejectReason::OutOfOrder,
                distance_m: 0.0,
            };
        }

        let distance_m = fix_distance_m(last, candidate);
        let accuracy_threshold = last.accuracy_meters.max(MIN_ACCURACY_BUDGET_M)
            + candidate.accuracy_meters.max(MIN_ACCURACY_BUDGET_M);

        let reason = if distance_m < settings.min_radius_meters {
            Some(RejectReason::BelowMinRadius)
        } else if distance_m <= accuracy_threshold {
            Some(RejectReason::WithinAccuracy)
        } else if distance_m <= PROGRESS_DISTANCE_M && time_diff_ms <= MAX_SILENCE_MS {
            Some(RejectReason::NoProgress)
        } else {
            None
        };

        match reason {
            Some(reason) => FilterDecision::Reject { reason, distance_m },
            None => FilterDecision::Accept { distance_m },
        }
    }
}

/// Decide whether `candidate` should be recorded, using the default filter.
pub fn should_accept(
    last: Option<&LocationFix>,
    candidate: &LocationFix,
    settings: &TrackSettings,
) -> bool {
    FixFilter::default()
        .evaluate(last, candidate, settings)
        .is_accept()
}
