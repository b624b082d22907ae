//! `GeoJSON` feature collection decoding.
//!
//! Both WFS responses and local source files arrive as WGS84 `GeoJSON`.
//! Features are reprojected into the display CRS on the way in.

use std::collections::BTreeMap;

use geojson::GeoJson;
use geoprobe_feature_models::Feature;
use thiserror::Error;

use crate::projection;

/// Errors from decoding a `GeoJSON` document into features.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// The text is not valid `GeoJSON`.
    #[error("Invalid GeoJSON: {0}")]
    Invalid(#[from] geojson::Error),

    /// The document is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, got {found}")]
    NotACollection {
        /// The kind of document that was found.
        found: &'static str,
    },
}

/// Parses a WGS84 `FeatureCollection` into display-CRS features owned by
/// `source_id`.
///
/// Features without geometry, or whose geometry cannot be converted, are
/// skipped with a warning. Missing ids fall back to `"{id_prefix}.{n}"`
/// where `n` is the feature's position in the collection.
///
/// # Errors
///
/// Returns [`GeoJsonError`] if the text is not `GeoJSON` or is not a
/// `FeatureCollection`.
pub fn parse_feature_collection(
    text: &str,
    source_id: &str,
    id_prefix: &str,
) -> Result<Vec<Feature>, GeoJsonError> {
    let geojson: GeoJson = text.parse()?;

    let collection = match geojson {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(_) => return Err(GeoJsonError::NotACollection { found: "Feature" }),
        GeoJson::Geometry(_) => return Err(GeoJsonError::NotACollection { found: "Geometry" }),
    };

    let total = collection.features.len();
    let features: Vec<Feature> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(n, feature)| convert_feature(feature, n, source_id, id_prefix))
        .collect();

    if features.len() < total {
        log::warn!(
            "{source_id}: skipped {} of {total} features without usable geometry",
            total - features.len()
        );
    }

    Ok(features)
}

fn convert_feature(
    feature: geojson::Feature,
    n: usize,
    source_id: &str,
    id_prefix: &str,
) -> Option<Feature> {
    let geometry: geo::Geometry<f64> = feature.geometry?.try_into().ok()?;

    let id = match feature.id {
        Some(geojson::feature::Id::String(s)) => s,
        Some(geojson::feature::Id::Number(n)) => n.to_string(),
        None => format!("{id_prefix}.{n}"),
    };

    let attributes: BTreeMap<String, serde_json::Value> =
        feature.properties.unwrap_or_default().into_iter().collect();

    Some(Feature {
        id,
        geometry: projection::geometry_to_projected(&geometry),
        attributes,
        source_id: source_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_features_and_reprojects() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "roads.7",
                "geometry": { "type": "Point", "coordinates": [1.0, 0.0] },
                "properties": { "name": "Main St", "lanes": 2 }
            }]
        })
        .to_string();

        let features = parse_feature_collection(&body, "roads", "gis:roads").unwrap();
        assert_eq!(features.len(), 1);
        let feature = &features[0];
        assert_eq!(feature.id, "roads.7");
        assert_eq!(feature.source_id, "roads");
        assert_eq!(feature.attributes["name"], "Main St");
        assert_eq!(feature.attributes["lanes"], 2);
        let geo::Geometry::Point(p) = feature.geometry else {
            panic!("expected a point");
        };
        assert!((p.x() - projection::UNITS_PER_DEGREE).abs() < 1e-6);
    }

    #[test]
    fn missing_ids_fall_back_to_position() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {} },
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }, "properties": null },
                { "type": "Feature", "id": 42, "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }, "properties": {} }
            ]
        })
        .to_string();

        let features = parse_feature_collection(&body, "wells", "gis:wells").unwrap();
        let ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["gis:wells.1", "42"]);
        assert!(features[0].attributes.is_empty());
    }

    #[test]
    fn rejects_non_collection() {
        let body = r#"{ "type": "Point", "coordinates": [0.0, 0.0] }"#;
        assert!(matches!(
            parse_feature_collection(body, "x", "x"),
            Err(GeoJsonError::NotACollection { found: "Geometry" })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_feature_collection("<html>oops</html>", "x", "x"),
            Err(GeoJsonError::Invalid(_))
        ));
    }
}
