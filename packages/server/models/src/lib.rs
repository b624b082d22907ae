#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the geoprobe server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the engine types so the API contract can evolve independently;
//! geometries are returned as WGS84 `GeoJSON`.

use std::collections::BTreeMap;

use geoprobe_feature_models::{
    Locality, MapPoint, MatchResult, OutcomeStatus, QueryOutcome, SourceDescriptor, SourceStatus,
};
use geoprobe_spatial::projection;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// A configured source as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSource {
    /// Source identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Local or remote.
    pub locality: Locality,
    /// Whether the source is currently queried.
    pub visible: bool,
}

impl ApiSource {
    /// Builds the API view of a source.
    #[must_use]
    pub fn new(descriptor: &SourceDescriptor, visible: bool) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            locality: descriptor.kind(),
            visible,
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMatch {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Source the feature came from.
    pub source_id: String,
    /// Display name of the source.
    pub source_name: String,
    /// Feature identifier within its source.
    pub feature_id: String,
    /// Distance from the click in kilometres.
    pub distance_km: f64,
    /// Feature geometry in WGS84.
    pub geometry: geojson::Geometry,
    /// Feature attributes.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ApiMatch {
    /// Builds the API view of a match.
    #[must_use]
    pub fn new(rank: usize, result: &MatchResult, source_name: String) -> Self {
        let geometry = projection::geometry_to_geographic(&result.feature.geometry);
        Self {
            rank,
            source_id: result.source_id.clone(),
            source_name,
            feature_id: result.feature.id.clone(),
            distance_km: result.distance_km,
            geometry: geojson::Geometry::new(geojson::Value::from(&geometry)),
            attributes: result.feature.attributes.clone(),
        }
    }
}

/// Response of the identify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOutcome {
    /// Request number assigned by the server.
    pub generation: u64,
    /// Overall classification.
    pub status: OutcomeStatus,
    /// Human-readable one-liner.
    pub summary: String,
    /// Ranked matches, nearest first.
    pub matches: Vec<ApiMatch>,
    /// Per-source status.
    pub sources: BTreeMap<String, SourceStatus>,
}

impl ApiOutcome {
    /// Builds the API view of an outcome, naming sources with `name_of`
    /// (falling back to the source id).
    #[must_use]
    pub fn new(outcome: &QueryOutcome, name_of: impl Fn(&str) -> Option<String>) -> Self {
        let matches = outcome
            .results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let name = name_of(&result.source_id).unwrap_or_else(|| result.source_id.clone());
                ApiMatch::new(i + 1, result, name)
            })
            .collect();

        Self {
            generation: outcome.generation,
            status: outcome.status,
            summary: outcome.summary(),
            matches,
            sources: outcome.statuses.clone(),
        }
    }
}

/// Query parameters for the identify endpoint.
///
/// The click is given either in the display CRS (`x`, `y`) or in WGS84
/// (`lon`, `lat`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyParams {
    /// Click x in the display CRS.
    pub x: Option<f64>,
    /// Click y in the display CRS.
    pub y: Option<f64>,
    /// Click longitude.
    pub lon: Option<f64>,
    /// Click latitude.
    pub lat: Option<f64>,
    /// Display units per pixel; defaults to the configured viewport.
    pub resolution: Option<f64>,
    /// Comma-separated source ids to restrict the query to.
    pub sources: Option<String>,
}

impl IdentifyParams {
    /// The click point in the display CRS.
    ///
    /// # Errors
    ///
    /// Returns a message if neither a complete `x`/`y` nor a complete
    /// `lon`/`lat` pair was given.
    pub fn click(&self) -> Result<MapPoint, String> {
        match (self.x, self.y, self.lon, self.lat) {
            (Some(x), Some(y), _, _) => Ok(MapPoint::projected(x, y)),
            (_, _, Some(lon), Some(lat)) => {
                Ok(projection::to_projected(MapPoint::geographic(lon, lat)))
            }
            _ => Err("expected x and y, or lon and lat".to_string()),
        }
    }

    /// Source ids to restrict the query to, if a filter was given.
    #[must_use]
    pub fn source_filter(&self) -> Option<Vec<String>> {
        self.sources.as_deref().map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
