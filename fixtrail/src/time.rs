//! Time-related utility functions.
//!
//! Fix timestamps and session boundaries are Unix epoch milliseconds.

use chrono::{TimeZone, Utc};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a duration in seconds as `HH:MM:SS`.
///
/// Fractions are truncated and negative inputs clamp to zero. Hours are
/// not wrapped at 24.
///
/// # Example
///
/// ```
/// use fixtrail::time::format_hms;
///
/// assert_eq!(format_hms(3_725.9), "01:02:05");
/// ```
pub fn format_hms(total_seconds: f64) -> String {
    let secs = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Render an epoch-millisecond timestamp as RFC 3339 (UTC).
///
/// Returns `None` for values outside chrono's range.
pub fn format_timestamp(timestamp_ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(59.999), "00:00:59");
        assert_eq!(format_hms(90_061.0), "25:01:01");
        assert_eq!(format_hms(-5.0), "00:00:00");
        assert_eq!(format_hms(f64::NAN), "00:00:00");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(0).as_deref(),
            Some("1970-01-01T00:00:00+00:00")
        );
    }
}
