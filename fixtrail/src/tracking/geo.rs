//! Great-circle distance on a spherical Earth.

use super::fix::{Coordinate, LocationFix};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Calculate the great-circle distance between two positions.
///
/// Uses the haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
///
/// # Example
///
/// ```
/// use fixtrail::tracking::haversine_m;
///
/// // One degree of longitude along the equator
/// let dist = haversine_m((0.0, 0.0), (0.0, 1.0));
/// assert!((dist - 111_195.0).abs() < 1.0);
/// ```
pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two fixes in meters.
#[inline]
pub fn fix_distance_m(a: &LocationFix, b: &LocationFix) -> f64 {
    haversine_m((a.latitude, a.longitude), (b.latitude, b.longitude))
}

/// Distance between two coordinates in meters.
#[inline]
pub fn coordinate_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_m((a.latitude, a.longitude), (b.latitude, b.longitude))
}
