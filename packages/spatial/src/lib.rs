#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry math for the nearest-feature engine.
//!
//! Converts between the display CRS (spherical Web Mercator) and WGS84,
//! derives the click search radius from the viewport resolution, and finds
//! the closest feature of an in-memory source. Local sources are held as
//! copy-on-write snapshots backed by an R-tree so a scan never observes a
//! half-applied edit.

pub mod decode;
pub mod distance;
pub mod local;
pub mod projection;
pub mod radius;
pub mod store;

pub use radius::{DEFAULT_PIXEL_TOLERANCE, QueryGeometry, SearchRadius};
pub use store::{FeatureSnapshot, LocalFeatureStore};
