//! Spherical geometry for tour search.
//!
//! Two earth radii are in play. Radius queries convert a distance into an
//! angle with the unit-specific radius (miles or kilometres), while distance
//! listings report metres on a 6378.1 km sphere and then scale to the unit.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Earth radius in miles used for `mi` radius queries.
pub const EARTH_RADIUS_MI: f64 = 3963.2;
/// Earth radius in kilometres used for `km` radius queries.
pub const EARTH_RADIUS_KM: f64 = 6378.1;
/// Sphere radius in metres used when reporting distances.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

const METERS_TO_MILES: f64 = 0.000621371;
const METERS_TO_KILOMETERS: f64 = 0.001;

/// Unit accepted by geospatial endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Mi,
    Km,
}

impl DistanceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mi => "mi",
            Self::Km => "km",
        }
    }

    /// Convert a distance in this unit into an angle in radians.
    pub fn radius_radians(&self, distance: f64) -> f64 {
        match self {
            Self::Mi => distance / EARTH_RADIUS_MI,
            Self::Km => distance / EARTH_RADIUS_KM,
        }
    }

    /// Multiplier applied to a distance in metres.
    pub fn meters_multiplier(&self) -> f64 {
        match self {
            Self::Mi => METERS_TO_MILES,
            Self::Km => METERS_TO_KILOMETERS,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mi" => Ok(Self::Mi),
            "km" => Ok(Self::Km),
            other => Err(DomainError::malformed(format!(
                "Unsupported unit '{other}'. Use mi or km."
            ))),
        }
    }
}

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse the `lat,lng` form used in URLs.
    pub fn parse_lat_lng(raw: &str) -> Result<Self, DomainError> {
        let invalid =
            || DomainError::malformed("Please provide latitude and longitude in the format lat,lng.");

        let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
        let point = Self { lng, lat };
        if point.is_valid() { Ok(point) } else { Err(invalid()) }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle angle between two points, in radians (haversine).
    pub fn angle_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * h.sqrt().min(1.0).asin()
    }

    /// True when `other` lies within `distance` (in `unit`) of this point.
    pub fn within(&self, other: &GeoPoint, distance: f64, unit: DistanceUnit) -> bool {
        self.angle_to(other) <= unit.radius_radians(distance)
    }

    /// Distance to `other` reported in `unit`.
    pub fn distance_to(&self, other: &GeoPoint, unit: DistanceUnit) -> f64 {
        self.angle_to(other) * EARTH_RADIUS_M * unit.meters_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Los Angeles and Las Vegas, roughly 228 miles apart.
    fn la() -> GeoPoint {
        GeoPoint::new(-118.2437, 34.0522)
    }

    fn vegas() -> GeoPoint {
        GeoPoint::new(-115.1398, 36.1699)
    }

    #[test]
    fn parses_lat_lng_order() {
        let p = GeoPoint::parse_lat_lng("34.1,-118.1").unwrap();
        assert_eq!(p, GeoPoint::new(-118.1, 34.1));
    }

    #[test]
    fn rejects_missing_coordinate() {
        let err = GeoPoint::parse_lat_lng("34.1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please provide latitude and longitude in the format lat,lng."
        );
        assert!(GeoPoint::parse_lat_lng("34.1,").is_err());
        assert!(GeoPoint::parse_lat_lng("95,10").is_err());
    }

    #[test]
    fn unit_radii_differ() {
        assert_eq!(DistanceUnit::Mi.radius_radians(3963.2), 1.0);
        assert_eq!(DistanceUnit::Km.radius_radians(6378.1), 1.0);
        assert!("m".parse::<DistanceUnit>().is_err());
    }

    #[test]
    fn distance_between_known_cities() {
        let miles = la().distance_to(&vegas(), DistanceUnit::Mi);
        assert!((miles - 228.0).abs() < 3.0, "got {miles}");
        let km = la().distance_to(&vegas(), DistanceUnit::Km);
        assert!((km - 367.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn within_respects_radius() {
        assert!(la().within(&vegas(), 250.0, DistanceUnit::Mi));
        assert!(!la().within(&vegas(), 200.0, DistanceUnit::Mi));
        assert!(la().within(&la(), 0.0, DistanceUnit::Km));
    }

    fn point() -> impl Strategy<Value = GeoPoint> {
        (-180.0f64..=180.0, -90.0f64..=90.0).prop_map(|(lng, lat)| GeoPoint::new(lng, lat))
    }

    proptest! {
        #[test]
        fn angle_is_symmetric_and_bounded(a in point(), b in point()) {
            let ab = a.angle_to(&b);
            prop_assert!((ab - b.angle_to(&a)).abs() < 1e-9);
            prop_assert!((0.0..=std::f64::consts::PI + 1e-9).contains(&ab));
        }

        #[test]
        fn reported_km_agree_with_km_radius(a in point(), b in point()) {
            let km = a.distance_to(&b, DistanceUnit::Km);
            prop_assert!(a.within(&b, km + 1e-6, DistanceUnit::Km));
        }
    }
}
