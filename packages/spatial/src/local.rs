//! Nearest-feature search over an in-memory source.

use geoprobe_feature_models::MatchResult;

use crate::{FeatureSnapshot, QueryGeometry, distance};

/// Finds the closest feature of a local source within the search radius.
///
/// Returns `None` when the snapshot is empty or nothing lies within
/// `geometry.radius.projected` (a feature exactly on the radius counts).
/// Equidistant features resolve to the one stored first.
#[must_use]
pub fn search(snapshot: &FeatureSnapshot, geometry: &QueryGeometry) -> Option<MatchResult> {
    let click = geometry.projected;
    let radius = geometry.radius.projected;

    let (_, feature, units) = distance::closest_candidate(
        snapshot.candidates_near(click.x, click.y, radius),
        click.to_geo(),
        Some(radius),
    )?;

    log::trace!(
        "local nearest in {}: {} at {units:.1} units",
        feature.source_id,
        feature.id
    );

    Some(distance::to_match(feature, units, geometry.latitude()))
}
