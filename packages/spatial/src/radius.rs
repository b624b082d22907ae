//! Search radius derived from the viewport resolution.
//!
//! The radius covers a fixed on-screen footprint (`pixel_tolerance`
//! pixels), so the physical search area grows as the user zooms out.

use geoprobe_feature_models::{BoundingBox, MapPoint};

use crate::projection;

/// Default click tolerance, in screen pixels.
pub const DEFAULT_PIXEL_TOLERANCE: f64 = 50.0;

/// Coarse metres-per-degree used to turn the projected radius into a
/// degree radius for the remote bbox pre-filter. Ignores latitude.
pub const METERS_PER_DEGREE_APPROX: f64 = 111_000.0;

/// The radius of one query, in both working CRSs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRadius {
    /// Radius in display-CRS units.
    pub projected: f64,
    /// Radius in geographic degrees.
    pub geographic: f64,
}

impl SearchRadius {
    /// Computes the radius for a viewport resolution (display units per pixel).
    #[must_use]
    pub fn from_resolution(resolution: f64, pixel_tolerance: f64) -> Self {
        let projected = resolution * pixel_tolerance;
        Self {
            projected,
            geographic: projected / METERS_PER_DEGREE_APPROX,
        }
    }

    /// Builds `[lon - r, lat - r, lon + r, lat + r]` around a WGS84 point.
    #[must_use]
    pub fn bbox_around(&self, geographic: MapPoint) -> BoundingBox {
        let r = self.geographic;
        BoundingBox::new(
            geographic.x - r,
            geographic.y - r,
            geographic.x + r,
            geographic.y + r,
        )
    }
}

/// Geometry shared by every source search of one request.
///
/// Computed once so local and remote sources use the same radius and the
/// same click location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryGeometry {
    /// Click point in the display CRS.
    pub projected: MapPoint,
    /// Click point in WGS84.
    pub geographic: MapPoint,
    /// Search radius.
    pub radius: SearchRadius,
}

impl QueryGeometry {
    /// Precomputes the click geometry for a request.
    #[must_use]
    pub fn new(click: MapPoint, resolution: f64, pixel_tolerance: f64) -> Self {
        Self {
            projected: projection::to_projected(click),
            geographic: projection::to_geographic(click),
            radius: SearchRadius::from_resolution(resolution, pixel_tolerance),
        }
    }

    /// Latitude of the click, used for the km conversion.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.geographic.y
    }

    /// The remote pre-filter box around the click.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        self.radius.bbox_around(self.geographic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tolerance_at_resolution_150() {
        let radius = SearchRadius::from_resolution(150.0, DEFAULT_PIXEL_TOLERANCE);
        assert!((radius.projected - 7500.0).abs() < f64::EPSILON);
        assert!((radius.geographic - 0.0676).abs() < 1e-4);
    }

    #[test]
    fn radius_is_linear_and_increasing_in_resolution() {
        let mut previous = 0.0;
        for resolution in [0.1, 1.0, 2.5, 19.1, 150.0, 4891.97] {
            let radius = SearchRadius::from_resolution(resolution, DEFAULT_PIXEL_TOLERANCE);
            assert!((radius.projected - resolution * DEFAULT_PIXEL_TOLERANCE).abs() < 1e-9);
            assert!(radius.projected > previous);
            previous = radius.projected;
        }
    }

    #[test]
    fn bbox_is_centred_on_click() {
        let geometry = QueryGeometry::new(MapPoint::projected(0.0, 0.0), 150.0, 50.0);
        let bbox = geometry.bbox();
        assert!((bbox.west + bbox.east).abs() < 1e-12);
        assert!((bbox.south + bbox.north).abs() < 1e-12);
        assert!((bbox.east - geometry.radius.geographic).abs() < 1e-12);
    }

    #[test]
    fn bbox_covers_projected_radius_at_high_latitudes() {
        for lat in [0.0, 45.0, 70.0, 80.0, 84.0] {
            let click = projection::to_projected(MapPoint::geographic(10.0, lat));
            let geometry = QueryGeometry::new(click, 150.0, DEFAULT_PIXEL_TOLERANCE);
            let bbox = geometry.bbox();
            let r = geometry.radius.projected;

            for (dx, dy) in [(r, 0.0), (-r, 0.0), (0.0, r), (0.0, -r)] {
                let edge = projection::to_geographic(MapPoint::projected(
                    click.x + dx,
                    click.y + dy,
                ));
                assert!(
                    bbox.contains(edge.x, edge.y),
                    "lat {lat}: ({}, {}) outside {bbox:?}",
                    edge.x,
                    edge.y
                );
            }
        }
    }

    #[test]
    fn geometry_keeps_both_forms_of_the_click() {
        let click = MapPoint::projected(-412_305.13, 4_926_696.67);
        let geometry = QueryGeometry::new(click, 10.0, 50.0);
        assert_eq!(geometry.projected, click);
        assert!((geometry.latitude() - 40.4168).abs() < 1e-4);
    }
}
