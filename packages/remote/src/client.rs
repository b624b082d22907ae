//! Concurrent nearest-feature queries across remote sources.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use geoprobe_feature_models::MatchResult;
use geoprobe_spatial::{QueryGeometry, decode, distance};

use crate::{FeatureFetcher, RemoteError, RemoteTarget};

/// Default per-source timeout.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of querying one remote source.
pub type RemoteResult = Result<Option<MatchResult>, RemoteError>;

/// Queries remote sources for their nearest feature to a click.
#[derive(Clone)]
pub struct RemoteFeatureQueryClient {
    fetcher: Arc<dyn FeatureFetcher>,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteFeatureQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFeatureQueryClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteFeatureQueryClient {
    /// Creates a client that gives each source `timeout` to answer.
    #[must_use]
    pub fn new(fetcher: Arc<dyn FeatureFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Queries every target concurrently and returns one result per
    /// source id.
    ///
    /// Each source runs under its own timeout. A failure, timeout, or
    /// empty answer from one source never affects the others.
    pub async fn query_many(
        &self,
        targets: &[RemoteTarget],
        geometry: &QueryGeometry,
    ) -> BTreeMap<String, RemoteResult> {
        let tasks = targets.iter().map(|target| async move {
            let result = self.query_with_timeout(target, geometry).await;
            if let Err(e) = &result {
                log::warn!("Remote source {} failed: {e}", target.source_id);
            }
            (target.source_id.clone(), result)
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// Queries one target, failing with [`RemoteError::Timeout`] if it
    /// takes longer than the client's timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the fetch fails, times out, or the body
    /// is not a feature collection.
    pub async fn query_with_timeout(
        &self,
        target: &RemoteTarget,
        geometry: &QueryGeometry,
    ) -> RemoteResult {
        tokio::time::timeout(self.timeout, self.query_source(target, geometry))
            .await
            .unwrap_or_else(|_| {
                Err(RemoteError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }

    /// Fetches everything inside the click bbox and returns the feature
    /// closest to the click by exact geometric distance, within the same
    /// projected radius local sources use.
    ///
    /// The bbox is only a coarse pre-filter: every returned feature is
    /// measured, so the result is the true nearest rather than the first
    /// one the server happened to list. Features in the bbox corners or
    /// past the radius at high latitudes are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the fetch fails or the body is not a
    /// feature collection.
    pub async fn query_source(
        &self,
        target: &RemoteTarget,
        geometry: &QueryGeometry,
    ) -> RemoteResult {
        let body = self.fetcher.fetch(target, &geometry.bbox()).await?;
        let features =
            decode::parse_feature_collection(&body, &target.source_id, &target.type_name)?;

        log::debug!(
            "{}: {} features inside bbox",
            target.source_id,
            features.len()
        );

        Ok(
            distance::closest_candidate(
                features.iter().enumerate(),
                geometry.projected.to_geo(),
                Some(geometry.radius.projected),
            )
            .map(|(_, feature, units)| distance::to_match(feature, units, geometry.latitude())),
        )
    }
}
