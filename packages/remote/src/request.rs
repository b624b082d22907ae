//! WFS `GetFeature` request parameters.

use geoprobe_feature_models::{BoundingBox, Crs};

/// Default WFS protocol version. 1.0.0 keeps lon/lat axis order for
/// `EPSG:4326` bboxes on every server.
pub const DEFAULT_WFS_VERSION: &str = "1.0.0";

/// `outputFormat` requesting a `GeoJSON` feature collection.
pub const GEOJSON_OUTPUT_FORMAT: &str = "application/json";

/// Builds the query string for a `GetFeature` request returning every
/// feature of `type_name` that intersects `bbox`.
///
/// No `maxFeatures` cap is sent: the nearest feature must be chosen from
/// the complete set inside the box.
#[must_use]
pub fn get_feature_params(
    type_name: &str,
    bbox: &BoundingBox,
    version: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("service", "WFS".to_string()),
        ("version", version.to_string()),
        ("request", "GetFeature".to_string()),
        ("typeName", type_name.to_string()),
        ("outputFormat", GEOJSON_OUTPUT_FORMAT.to_string()),
        ("bbox", format_bbox(bbox)),
    ]
}

/// Formats a bbox as `minx,miny,maxx,maxy,EPSG:4326`.
#[must_use]
pub fn format_bbox(bbox: &BoundingBox) -> String {
    format!(
        "{},{},{},{},{}",
        bbox.west,
        bbox.south,
        bbox.east,
        bbox.north,
        Crs::Geographic.epsg()
    )
}
