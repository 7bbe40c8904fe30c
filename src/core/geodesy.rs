//! Great-circle distance and unit-sphere projection.
//!
//! All angles are in degrees, all distances in meters on a spherical Earth.
//! The spatial index works in Cartesian space on the unit sphere, so geodesic
//! radii are converted to chord lengths before querying.

use super::types::GeoPoint;

/// Mean Earth radius used by every distance computation (meters).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two lat/lon pairs in meters.
///
/// # Example
/// ```
/// use pramana::core::geodesy::haversine_distance;
///
/// // 0.001° of longitude at the equator is about 111 m
/// let d = haversine_distance(0.0, 0.0, 0.0, 0.001);
/// assert!((d - 111.19).abs() < 0.1);
/// ```
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Distance between any two geo-tagged records in meters.
#[inline]
pub fn distance<A: GeoPoint + ?Sized, B: GeoPoint + ?Sized>(a: &A, b: &B) -> f64 {
    haversine_distance(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Project a lat/lon pair onto the unit sphere.
#[inline]
pub fn to_unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

/// Convert a geodesic distance to the equivalent chord on the unit sphere.
///
/// `chord = 2·sin(arc/2)` where `arc = meters / R`. Monotonic for arcs up to
/// half the circumference.
#[inline]
pub fn meters_to_chord_length(meters: f64) -> f64 {
    let arc = meters / EARTH_RADIUS_METERS;
    2.0 * (arc / 2.0).sin()
}

/// Inverse of [`meters_to_chord_length`].
#[inline]
pub fn chord_length_to_meters(chord: f64) -> f64 {
    let half = (chord / 2.0).clamp(-1.0, 1.0);
    2.0 * half.asin() * EARTH_RADIUS_METERS
}

/// Squared Euclidean distance between two unit-sphere points.
#[inline]
pub fn chord_distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_for_identical_points() {
        assert_eq!(haversine_distance(40.7128, -74.006, 40.7128, -74.006), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = haversine_distance(40.7128, -74.006, 40.7306, -73.9352);
        let b = haversine_distance(40.7306, -73.9352, 40.7128, -74.006);
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }

    #[test]
    fn test_fifty_meters_north() {
        // 0.00045° of latitude ≈ 50 m
        let d = haversine_distance(0.0, 0.0, 0.00045, 0.0);
        assert_relative_eq!(d, 50.04, epsilon = 0.1);
    }

    #[test]
    fn test_monotonic_with_separation() {
        let mut last = 0.0;
        for i in 1..50 {
            let d = haversine_distance(10.0, 10.0, 10.0 + i as f64 * 0.0001, 10.0);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn test_unit_sphere_projection() {
        let p = to_unit_sphere(0.0, 0.0);
        assert_relative_eq!(p[0], 1.0);
        assert_relative_eq!(p[1], 0.0);
        assert_relative_eq!(p[2], 0.0);

        let north = to_unit_sphere(90.0, 0.0);
        assert_relative_eq!(north[2], 1.0);

        let q = to_unit_sphere(40.7128, -74.006);
        let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2]).sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chord_matches_projection() {
        let (lat1, lon1, lat2, lon2) = (40.7128, -74.006, 40.7135, -74.0052);
        let meters = haversine_distance(lat1, lon1, lat2, lon2);
        let a = to_unit_sphere(lat1, lon1);
        let b = to_unit_sphere(lat2, lon2);
        let chord = chord_distance_sq(&a, &b).sqrt();
        assert_relative_eq!(chord, meters_to_chord_length(meters), max_relative = 1e-6);
    }

    #[test]
    fn test_chord_round_trip() {
        for meters in [0.0, 1.0, 50.0, 1_000.0, 100_000.0] {
            let chord = meters_to_chord_length(meters);
            assert_relative_eq!(chord_length_to_meters(chord), meters, epsilon = 1e-6);
        }
    }
}
