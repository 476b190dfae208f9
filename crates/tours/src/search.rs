//! Geospatial selection over tour start locations.

use serde::Serialize;

use tourbook_core::{DistanceUnit, GeoPoint, TourId};

use crate::tour::Tour;

/// Tours whose start location lies within `distance` of `center`.
/// Tours without a start location never match.
pub fn tours_within(tours: Vec<Tour>, center: GeoPoint, distance: f64, unit: DistanceUnit) -> Vec<Tour> {
    tours
        .into_iter()
        .filter(|tour| {
            tour.start_location
                .as_ref()
                .is_some_and(|loc| center.within(&loc.point(), distance, unit))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourDistance {
    pub id: TourId,
    pub name: String,
    pub distance: f64,
}

/// Distance from `center` to each tour's start, nearest first.
pub fn distances_from(tours: &[Tour], center: GeoPoint, unit: DistanceUnit) -> Vec<TourDistance> {
    let mut out: Vec<TourDistance> = tours
        .iter()
        .filter_map(|tour| {
            let start = tour.start_location.as_ref()?;
            Some(TourDistance {
                id: tour.id,
                name: tour.name.clone(),
                distance: center.distance_to(&start.point(), unit),
            })
        })
        .collect();
    out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    out
}
