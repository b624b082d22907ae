#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core types shared by every geoprobe crate.
//!
//! Describes map points and their coordinate reference systems, features
//! and the sources that own them, and the request/outcome pair that flows
//! through the nearest-feature engine. These types carry no behaviour
//! beyond validation and small accessors; the geometry math lives in
//! `geoprobe_spatial`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinate reference system a [`MapPoint`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// The display CRS: spherical Web Mercator (EPSG:3857), in metres.
    Projected,
    /// WGS84 longitude/latitude (EPSG:4326), in degrees.
    Geographic,
}

impl Crs {
    /// Returns the EPSG code string for this CRS.
    #[must_use]
    pub const fn epsg(self) -> &'static str {
        match self {
            Self::Projected => "EPSG:3857",
            Self::Geographic => "EPSG:4326",
        }
    }
}

/// A coordinate pair tagged with the CRS it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    /// Easting (projected) or longitude (geographic).
    pub x: f64,
    /// Northing (projected) or latitude (geographic).
    pub y: f64,
    /// Which CRS `x`/`y` are expressed in.
    pub crs: Crs,
}

impl MapPoint {
    /// Creates a point in the display CRS.
    #[must_use]
    pub const fn projected(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            crs: Crs::Projected,
        }
    }

    /// Creates a WGS84 point from longitude and latitude.
    #[must_use]
    pub const fn geographic(lon: f64, lat: f64) -> Self {
        Self {
            x: lon,
            y: lat,
            crs: Crs::Geographic,
        }
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Converts to a `geo` point (the CRS tag is dropped).
    #[must_use]
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.x, self.y)
    }
}

/// A single geospatial record belonging to one source.
///
/// Local features are long-lived inside a source's store; remote features
/// are rebuilt from the service response on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier, unique within its source.
    pub id: String,
    /// Geometry in the display CRS.
    pub geometry: geo::Geometry<f64>,
    /// Flat attribute map.
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Identifier of the owning source.
    pub source_id: String,
}

impl Feature {
    /// Creates a feature with no attributes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        geometry: impl Into<geo::Geometry<f64>>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
            source_id: source_id.into(),
        }
    }

    /// Returns a copy of this feature with one more attribute set.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Bare locality tag of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
    /// Features are held in process memory.
    Local,
    /// Features are served over a remote feature-query protocol.
    Remote,
}

/// Where a source's features come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceLocality {
    /// In-memory features owned by the layer manager.
    Local,
    /// A WFS endpoint serving one feature type.
    Remote {
        /// Base URL of the WFS endpoint.
        endpoint: String,
        /// Qualified feature type name (e.g. `"gis:roads"`).
        type_name: String,
    },
}

/// A queryable source as described by the layer manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Locality and, for remote sources, the endpoint to query.
    pub locality: SourceLocality,
}

impl SourceDescriptor {
    /// Creates a descriptor for an in-memory source.
    #[must_use]
    pub fn local(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locality: SourceLocality::Local,
        }
    }

    /// Creates a descriptor for a WFS-backed source.
    #[must_use]
    pub fn remote(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locality: SourceLocality::Remote {
                endpoint: endpoint.into(),
                type_name: type_name.into(),
            },
        }
    }

    /// Returns the locality tag.
    #[must_use]
    pub const fn kind(&self) -> Locality {
        match self.locality {
            SourceLocality::Local => Locality::Local,
            SourceLocality::Remote { .. } => Locality::Remote,
        }
    }
}

/// An axis-aligned rectangle in geographic degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if the geographic point lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.west..=self.east).contains(&lon) && (self.south..=self.north).contains(&lat)
    }
}

/// Whether a click should identify features or is consumed by another tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Clicks run a nearest-feature query.
    #[default]
    Identify,
    /// Clicks belong to a drawing tool and are ignored by the engine.
    Drawing,
}

/// One nearest-feature query, built per user interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Clicked location in the display CRS.
    pub point: MapPoint,
    /// Viewport resolution (display units per pixel).
    pub resolution: f64,
    /// Sources visible when the click happened.
    pub sources: Vec<SourceDescriptor>,
}

impl QueryRequest {
    /// Creates a new request.
    #[must_use]
    pub const fn new(point: MapPoint, resolution: f64, sources: Vec<SourceDescriptor>) -> Self {
        Self {
            point,
            resolution,
            sources,
        }
    }

    /// Checks that the request can be executed at all.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found: non-finite
    /// coordinates, a point outside the display CRS, or a resolution that
    /// is not a positive finite number.
    pub fn validate(&self) -> Result<(), String> {
        if !self.point.is_finite() {
            return Err(format!(
                "click point ({}, {}) is not finite",
                self.point.x, self.point.y
            ));
        }
        if self.point.crs != Crs::Projected {
            return Err(format!(
                "click point must be in {}, got {}",
                Crs::Projected.epsg(),
                self.point.crs.epsg()
            ));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(format!(
                "resolution must be positive and finite, got {}",
                self.resolution
            ));
        }
        Ok(())
    }
}

/// The closest feature found in one source.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The matched feature.
    pub feature: Feature,
    /// Source the feature came from.
    pub source_id: String,
    /// Latitude-corrected distance in kilometres.
    pub distance_km: f64,
    /// Distance in projected working units, before unit conversion.
    pub distance_units: f64,
}

/// Why a single source produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFailure {
    /// Network-level failure talking to a remote source.
    #[error("transport failure: {message}")]
    RemoteTransport {
        /// Description of what went wrong.
        message: String,
    },

    /// The remote source did not answer in time.
    #[error("timed out after {timeout_ms}ms")]
    RemoteTimeout {
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The remote source answered with a body that is not a feature collection.
    #[error("malformed response: {message}")]
    RemoteParse {
        /// Description of the parse failure.
        message: String,
    },

    /// A local source disappeared or was hidden while the query ran.
    #[error("local source {source_id} is unavailable")]
    LocalSourceUnavailable {
        /// Identifier of the missing source.
        source_id: String,
    },
}

impl SourceFailure {
    /// Returns `true` for network and timeout failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RemoteTransport { .. } | Self::RemoteTimeout { .. }
        )
    }
}

/// Per-source outcome recorded for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source contributed a match.
    Matched,
    /// The source answered but nothing was within range.
    Empty,
    /// The source failed; siblings were unaffected.
    Failed {
        /// What went wrong.
        failure: SourceFailure,
    },
}

/// Overall classification of a [`QueryOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// At least one match was found.
    Ranked,
    /// Sources were queried but none had a candidate in range.
    NoCandidatesInRange,
    /// There was nothing to query.
    NoVisibleSources,
}

/// The ranked answer to one [`QueryRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Generation of the request that produced this outcome.
    pub generation: u64,
    /// At most one match per source, ascending by `distance_km`.
    pub results: Vec<MatchResult>,
    /// Status for every queried source.
    pub statuses: BTreeMap<String, SourceStatus>,
    /// Overall classification.
    pub status: OutcomeStatus,
}

impl QueryOutcome {
    /// The terminal outcome for a request with no sources.
    #[must_use]
    pub const fn no_visible_sources(generation: u64) -> Self {
        Self {
            generation,
            results: Vec::new(),
            statuses: BTreeMap::new(),
            status: OutcomeStatus::NoVisibleSources,
        }
    }

    /// Returns `true` if no source contributed a match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Matched features in ranked order.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        self.results.iter().map(|m| m.feature.clone()).collect()
    }

    /// Identifiers of sources that failed, with their failures.
    pub fn failed_sources(&self) -> impl Iterator<Item = (&str, &SourceFailure)> {
        self.statuses.iter().filter_map(|(id, status)| match status {
            SourceStatus::Failed { failure } => Some((id.as_str(), failure)),
            _ => None,
        })
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.status {
            OutcomeStatus::NoVisibleSources => "No visible layers to query".to_string(),
            OutcomeStatus::NoCandidatesInRange | OutcomeStatus::Ranked => {
                let failed = self.failed_sources().count();
                let found = self.results.len();
                let queried = self.statuses.len();
                let noun = if found == 1 { "feature" } else { "features" };
                let mut line = format!("{found} {noun} found across {queried} layers");
                if failed > 0 {
                    line.push_str(&format!(" ({failed} unavailable)"));
                }
                line
            }
        }
    }
}
