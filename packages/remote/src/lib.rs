#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearest-feature queries against remote WFS sources.
//!
//! WFS can only filter by rectangular extent, so each source is asked for
//! every feature intersecting a bbox around the click and the true nearest
//! feature is picked client-side by exact closest-point distance. Sources
//! are queried concurrently, each under its own timeout, and every
//! source's outcome is captured independently.

pub mod client;
pub mod fetcher;
pub mod request;
pub mod retry;

use geoprobe_feature_models::SourceFailure;
use geoprobe_spatial::decode::GeoJsonError;
use thiserror::Error;

pub use client::RemoteFeatureQueryClient;
pub use fetcher::{FeatureFetcher, WfsFetcher};

/// A remote source to query: where it lives and which feature type to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Identifier of the source.
    pub source_id: String,
    /// Base URL of the WFS endpoint.
    pub endpoint: String,
    /// Feature type name passed as `typeName`.
    pub type_name: String,
}

/// Errors from querying a single remote source.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// Numeric status code.
        status: u16,
    },

    /// The response body is not a `GeoJSON` feature collection.
    #[error("Parse error: {0}")]
    Parse(#[from] GeoJsonError),

    /// The source did not answer within its timeout.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },
}

impl From<RemoteError> for SourceFailure {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Http(e) => Self::RemoteTransport {
                message: e.to_string(),
            },
            RemoteError::Status { status } => Self::RemoteTransport {
                message: format!("HTTP status {status}"),
            },
            RemoteError::Parse(e) => Self::RemoteParse {
                message: e.to_string(),
            },
            RemoteError::Timeout { timeout_ms } => Self::RemoteTimeout { timeout_ms },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_transport_failure() {
        let failure: SourceFailure = RemoteError::Status { status: 503 }.into();
        assert_eq!(
            failure,
            SourceFailure::RemoteTransport {
                message: "HTTP status 503".to_string()
            }
        );
        assert!(failure.is_transport());
    }

    #[test]
    fn http_error_maps_to_transport_failure_with_message() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let message = err.to_string();

        let failure: SourceFailure = RemoteError::Http(err).into();

        assert_eq!(failure, SourceFailure::RemoteTransport { message });
        assert!(failure.is_transport());
    }

    #[test]
    fn timeout_keeps_its_budget() {
        let failure: SourceFailure = RemoteError::Timeout { timeout_ms: 2500 }.into();
        assert_eq!(failure, SourceFailure::RemoteTimeout { timeout_ms: 2500 });
    }

    #[test]
    fn parse_error_maps_to_parse_failure() {
        let err = geoprobe_spatial::decode::parse_feature_collection("nope", "a", "a").unwrap_err();
        let failure: SourceFailure = RemoteError::Parse(err).into();
        assert!(matches!(failure, SourceFailure::RemoteParse { .. }));
        assert!(!failure.is_transport());
    }
}
