//! Closest-point distances and the kilometre conversion.
//!
//! Distances are measured in the display CRS: closest point on the
//! feature geometry, then planar Euclidean distance. Converting to
//! kilometres applies a latitude correction taken from the click point,
//! compensating for Mercator stretch away from the equator.

use std::cmp::Ordering;

use geo::{Closest, ClosestPoint, Distance, Euclidean};
use geoprobe_feature_models::{Feature, MatchResult};

use crate::projection::UNITS_PER_DEGREE;

/// Length of one degree of longitude at the equator, in metres.
pub const METERS_PER_DEGREE_EQUATOR: f64 = 111_320.0;

/// Distance in projected units from `point` to the closest point of
/// `geometry`.
///
/// Returns `None` for geometries with no closest point (e.g. empty
/// collections).
#[must_use]
pub fn distance_to(geometry: &geo::Geometry<f64>, point: geo::Point<f64>) -> Option<f64> {
    match geometry.closest_point(&point) {
        Closest::Intersection(_) => Some(0.0),
        Closest::SinglePoint(closest) => Some(Euclidean.distance(point, closest)),
        Closest::Indeterminate => None,
    }
}

/// Ground metres represented by one projected unit at `latitude` degrees.
///
/// A projected distance is first read as equatorial degrees, then scaled
/// by `cos(latitude) * 111320` metres per degree.
#[must_use]
pub fn meters_per_unit(latitude: f64) -> f64 {
    latitude.to_radians().cos() * METERS_PER_DEGREE_EQUATOR / UNITS_PER_DEGREE
}

/// Converts a projected distance to kilometres at the given latitude.
#[must_use]
pub fn units_to_km(units: f64, latitude: f64) -> f64 {
    units * meters_per_unit(latitude) / 1000.0
}

/// Converts a ground distance in kilometres to projected units at the
/// given latitude.
#[must_use]
pub fn km_to_units(km: f64, latitude: f64) -> f64 {
    km * 1000.0 / meters_per_unit(latitude)
}

/// Picks the closest candidate to `point`.
///
/// Candidates are `(storage_index, feature)` pairs. Features farther than
/// `max_units` (when given) are discarded; a distance equal to the limit
/// is kept. Equal distances resolve to the lowest storage index, so the
/// first-stored feature wins regardless of candidate iteration order.
#[must_use]
pub fn closest_candidate<'a, I>(
    candidates: I,
    point: geo::Point<f64>,
    max_units: Option<f64>,
) -> Option<(usize, &'a Feature, f64)>
where
    I: IntoIterator<Item = (usize, &'a Feature)>,
{
    let mut best: Option<(usize, &'a Feature, f64)> = None;

    for (index, feature) in candidates {
        let Some(distance) = distance_to(&feature.geometry, point) else {
            continue;
        };
        if max_units.is_some_and(|max| distance > max) {
            continue;
        }
        let better = best.is_none_or(|(best_index, _, best_distance)| {
            match distance.total_cmp(&best_distance) {
                Ordering::Less => true,
                Ordering::Equal => index < best_index,
                Ordering::Greater => false,
            }
        });
        if better {
            best = Some((index, feature, distance));
        }
    }

    best
}

/// Builds the [`MatchResult`] for a winning feature.
#[must_use]
pub fn to_match(feature: &Feature, distance_units: f64, latitude: f64) -> MatchResult {
    MatchResult {
        feature: feature.clone(),
        source_id: feature.source_id.clone(),
        distance_km: units_to_km(distance_units, latitude),
        distance_units,
    }
}
