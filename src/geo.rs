//! Circle-overlap checks for work zones.
//!
//! Distances are haversine great-circle distances on a sphere with Earth's
//! mean radius. No projection or ellipsoid model is applied.

use serde::{Deserialize, Serialize};

use crate::work_order::ValidationError;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated WGS84-style coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange { value: latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A circular area of work impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkZone {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl WorkZone {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Result<Self, ValidationError> {
        validate_radius(radius_meters)?;
        Ok(Self {
            center,
            radius_meters,
        })
    }
}

fn validate_radius(radius_meters: f64) -> Result<(), ValidationError> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(ValidationError::NonPositiveRadius {
            value: radius_meters,
        });
    }
    Ok(())
}

/// Haversine distance between two points in meters. Symmetric, and exactly zero
/// for identical points.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let half_dlat = (lat_b - lat_a) / 2.0;
    let half_dlon = (b.longitude - a.longitude).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlon.sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance between the zone centers when the zones overlap, `None` when they don't.
pub fn overlap_distance(a: &WorkZone, b: &WorkZone) -> Result<Option<f64>, ValidationError> {
    validate_radius(a.radius_meters)?;
    validate_radius(b.radius_meters)?;

    let distance = distance_meters(&a.center, &b.center);
    if distance <= a.radius_meters + b.radius_meters {
        Ok(Some(distance))
    } else {
        Ok(None)
    }
}

/// True iff the two circles touch or overlap.
pub fn intersects(a: &WorkZone, b: &WorkZone) -> Result<bool, ValidationError> {
    Ok(overlap_distance(a, b)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(lat: f64, lon: f64, radius: f64) -> WorkZone {
        WorkZone::new(GeoPoint::new(lat, lon).unwrap(), radius).unwrap()
    }

    #[test]
    fn test_distance_of_known_pair() {
        // One degree of latitude is ~111.19 km on this sphere
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        let d = distance_meters(&a, &b);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_identical_points_have_zero_distance() {
        let p = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert_eq!(distance_meters(&p, &p), 0.0);
    }

    #[test]
    fn test_nearby_city_points() {
        // Two points ~168 m apart along a parallel in Manhattan
        let a = zone(40.7128, -74.0060, 10.0);
        let b = zone(40.7128, -74.0080, 10.0);
        let d = distance_meters(&a.center, &b.center);
        assert!(d > 160.0 && d < 175.0, "got {d}");
        assert!(!intersects(&a, &b).unwrap());

        let wide = zone(40.7128, -74.0080, 160.0);
        assert!(intersects(&a, &wide).unwrap());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let a = zone(0.0, 0.0, 1.0);
        let b = zone(0.0, 0.001, 1.0);
        let d = distance_meters(&a.center, &b.center);

        let touching = zone(0.0, 0.001, d - 1.0);
        assert!(intersects(&a, &touching).unwrap());

        let apart = zone(0.0, 0.001, d - 1.0 - 1e-6);
        assert!(!intersects(&a, &apart).unwrap());
    }

    #[test]
    fn test_non_positive_radius_is_rejected() {
        let good = zone(0.0, 0.0, 1.0);
        let bad = WorkZone {
            center: good.center,
            radius_meters: 0.0,
        };
        assert_eq!(
            intersects(&good, &bad).unwrap_err(),
            ValidationError::NonPositiveRadius { value: 0.0 }
        );
        assert!(intersects(&bad, &good).is_err());
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
        assert!(matches!(
            GeoPoint::new(90.0001, 0.0),
            Err(ValidationError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            GeoPoint::new(0.0, f64::INFINITY),
            Err(ValidationError::LongitudeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_antipodal_distance_is_half_circumference() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 180.0).unwrap();
        let d = distance_meters(&a, &b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }
}
