//! Conversions between the display CRS and WGS84.
//!
//! The display CRS is spherical Web Mercator (EPSG:3857). Both directions
//! are total for finite input: latitudes beyond the Mercator limit are
//! clamped before projecting.

use std::f64::consts::{FRAC_PI_4, PI};

use geo::MapCoords;
use geoprobe_feature_models::{Crs, MapPoint};

/// Radius of the Web Mercator sphere, in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined (the square-world limit).
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projected units spanned by one degree of longitude at the equator.
pub const UNITS_PER_DEGREE: f64 = 2.0 * PI * EARTH_RADIUS_M / 360.0;

/// Converts a point to WGS84 longitude/latitude.
///
/// Points already in the geographic CRS are returned unchanged.
#[must_use]
pub fn to_geographic(point: MapPoint) -> MapPoint {
    match point.crs {
        Crs::Geographic => point,
        Crs::Projected => {
            let (lon, lat) = unproject(point.x, point.y);
            MapPoint::geographic(lon, lat)
        }
    }
}

/// Converts a point to the display CRS.
///
/// Points already in the display CRS are returned unchanged.
#[must_use]
pub fn to_projected(point: MapPoint) -> MapPoint {
    match point.crs {
        Crs::Projected => point,
        Crs::Geographic => {
            let (x, y) = project(point.x, point.y);
            MapPoint::projected(x, y)
        }
    }
}

/// Reprojects every coordinate of a WGS84 geometry into the display CRS.
#[must_use]
pub fn geometry_to_projected(geometry: &geo::Geometry<f64>) -> geo::Geometry<f64> {
    geometry.map_coords(|c| {
        let (x, y) = project(c.x, c.y);
        geo::Coord { x, y }
    })
}

/// Reprojects every coordinate of a display-CRS geometry into WGS84.
#[must_use]
pub fn geometry_to_geographic(geometry: &geo::Geometry<f64>) -> geo::Geometry<f64> {
    geometry.map_coords(|c| {
        let (x, y) = unproject(c.x, c.y);
        geo::Coord { x, y }
    })
}

fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = 2.0f64
        .mul_add((y / EARTH_RADIUS_M).exp().atan(), -PI / 2.0)
        .to_degrees();
    (lon, lat)
}
