//! Transport seam for remote feature queries.
//!
//! [`FeatureFetcher`] returns the raw response body for one source and
//! bbox; [`WfsFetcher`] is the `reqwest` implementation used in
//! production.

use geoprobe_feature_models::BoundingBox;

use crate::{RemoteError, RemoteTarget, request, retry};

/// Default `User-Agent` sent to WFS endpoints.
pub const DEFAULT_USER_AGENT: &str = concat!("geoprobe/", env!("CARGO_PKG_VERSION"));

/// Fetches the features of one remote source inside a bbox.
#[async_trait::async_trait]
pub trait FeatureFetcher: Send + Sync {
    /// Returns the response body (expected to be a `GeoJSON`
    /// `FeatureCollection`) for every feature of `target` intersecting `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the request fails or the server answers
    /// with a non-success status.
    async fn fetch(&self, target: &RemoteTarget, bbox: &BoundingBox)
    -> Result<String, RemoteError>;
}

/// Fetches features over HTTP with WFS `GetFeature`.
#[derive(Debug, Clone)]
pub struct WfsFetcher {
    client: reqwest::Client,
    version: String,
    max_retries: u32,
}

impl WfsFetcher {
    /// Creates a fetcher around an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client, version: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client,
            version: version.into(),
            max_retries,
        }
    }

    /// Builds a `reqwest::Client` with the given `User-Agent` and a
    /// fetcher around it.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the client cannot be built.
    pub fn with_user_agent(
        user_agent: &str,
        version: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::new(client, version, max_retries))
    }
}

#[async_trait::async_trait]
impl FeatureFetcher for WfsFetcher {
    async fn fetch(
        &self,
        target: &RemoteTarget,
        bbox: &BoundingBox,
    ) -> Result<String, RemoteError> {
        let params = request::get_feature_params(&target.type_name, bbox, &self.version);
        log::debug!(
            "{}: GetFeature {} bbox={}",
            target.source_id,
            target.type_name,
            request::format_bbox(bbox)
        );
        retry::send_text(
            || self.client.get(&target.endpoint).query(&params),
            self.max_retries,
        )
        .await
    }
}
