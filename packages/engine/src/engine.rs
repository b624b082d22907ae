//! Stateless execution of a single nearest-feature request.

use std::sync::Arc;

use geoprobe_config::EngineSettings;
use geoprobe_feature_models::{
    MapPoint, QueryOutcome, QueryRequest, SourceDescriptor, SourceFailure,
};
use geoprobe_remote::{RemoteError, RemoteFeatureQueryClient, WfsFetcher};
use geoprobe_spatial::{DEFAULT_PIXEL_TOLERANCE, QueryGeometry, local};

use crate::aggregate::{self, SourceAnswer};
use crate::classify::classify;
use crate::{LayerManager, ProbeError};

/// Runs nearest-feature requests against a layer manager and a remote
/// client.
///
/// Holds no per-request state, so one engine can serve any number of
/// concurrent requests.
#[derive(Clone)]
pub struct QueryEngine {
    layers: Arc<dyn LayerManager>,
    remote: RemoteFeatureQueryClient,
    pixel_tolerance: f64,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("remote", &self.remote)
            .field("pixel_tolerance", &self.pixel_tolerance)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Creates an engine with the default pixel tolerance.
    #[must_use]
    pub fn new(layers: Arc<dyn LayerManager>, remote: RemoteFeatureQueryClient) -> Self {
        Self {
            layers,
            remote,
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
        }
    }

    /// Overrides the click tolerance, in screen pixels.
    #[must_use]
    pub fn with_pixel_tolerance(mut self, pixel_tolerance: f64) -> Self {
        self.pixel_tolerance = pixel_tolerance;
        self
    }

    /// Creates an engine that talks WFS over HTTP, configured from
    /// `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the HTTP client cannot be built.
    pub fn from_settings(
        layers: Arc<dyn LayerManager>,
        settings: &EngineSettings,
    ) -> Result<Self, RemoteError> {
        let fetcher = WfsFetcher::with_user_agent(
            &settings.user_agent,
            settings.wfs_version.as_str(),
            settings.max_retries,
        )?;
        let remote = RemoteFeatureQueryClient::new(Arc::new(fetcher), settings.remote_timeout());
        Ok(Self::new(layers, remote).with_pixel_tolerance(settings.pixel_tolerance))
    }

    /// Click tolerance in screen pixels.
    #[must_use]
    pub const fn pixel_tolerance(&self) -> f64 {
        self.pixel_tolerance
    }

    /// Builds a request for a click against every currently visible source.
    #[must_use]
    pub fn request_for(&self, point: MapPoint, resolution: f64) -> QueryRequest {
        QueryRequest::new(point, resolution, self.layers.visible_sources())
    }

    /// Finds the nearest feature in every source of `request` and ranks
    /// them by distance.
    ///
    /// Local sources are searched inline against their current snapshot.
    /// Remote sources are queried concurrently. One source failing never
    /// affects the others; its failure is recorded in the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidRequest`] if the request fails
    /// validation. Nothing is queried in that case.
    pub async fn execute(
        &self,
        request: &QueryRequest,
        generation: u64,
    ) -> Result<QueryOutcome, ProbeError> {
        request
            .validate()
            .map_err(|message| ProbeError::InvalidRequest { message })?;

        let classified = classify(&request.sources);
        if classified.is_empty() {
            log::debug!("[{generation}] no visible sources");
            return Ok(QueryOutcome::no_visible_sources(generation));
        }

        let geometry = QueryGeometry::new(request.point, request.resolution, self.pixel_tolerance);
        log::debug!(
            "[{generation}] querying {} local and {} remote sources, radius {:.1} units",
            classified.local.len(),
            classified.remote.len(),
            geometry.radius.projected
        );

        let local: Vec<(String, SourceAnswer)> = classified
            .local
            .iter()
            .map(|source| (source.id.clone(), self.search_local(source, &geometry)))
            .collect();

        let mut remote_results = self.remote.query_many(&classified.remote, &geometry).await;
        let remote: Vec<(String, SourceAnswer)> = classified
            .remote
            .iter()
            .filter_map(|target| {
                let result = remote_results.remove(&target.source_id)?;
                Some((
                    target.source_id.clone(),
                    result.map_err(SourceFailure::from),
                ))
            })
            .collect();

        let outcome = aggregate::aggregate(generation, local, remote);
        log::debug!("[{generation}] {}", outcome.summary());
        Ok(outcome)
    }

    fn search_local(&self, source: &SourceDescriptor, geometry: &QueryGeometry) -> SourceAnswer {
        self.layers.local_features(&source.id).map_or_else(
            || {
                log::warn!("Local source {} is no longer available", source.id);
                Err(SourceFailure::LocalSourceUnavailable {
                    source_id: source.id.clone(),
                })
            },
            |snapshot| Ok(local::search(&snapshot, geometry)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use geoprobe_feature_models::{OutcomeStatus, SourceStatus};
    use geoprobe_spatial::projection;

    use super::*;
    use crate::InMemoryLayerManager;
    use crate::testing::{
        FakeFetcher, MADRID, Reply, collection, east_of, point_feature, remote_client,
    };

    fn engine(layers: &Arc<InMemoryLayerManager>, fetcher: &Arc<FakeFetcher>) -> QueryEngine {
        QueryEngine::new(layers.clone(), remote_client(fetcher.clone()))
    }

    fn roads() -> SourceDescriptor {
        SourceDescriptor::remote("roads", "Roads", "http://wfs.test", "gis:roads")
    }

    #[tokio::test]
    async fn zero_sources_is_no_visible_sources() {
        let layers = Arc::new(InMemoryLayerManager::new());
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        let outcome = engine
            .execute(&engine.request_for(MADRID, 150.0), 1)
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::NoVisibleSources);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_fan_out() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_remote(roads(), true);
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        let request = engine.request_for(MADRID, -1.0);
        let err = engine.execute(&request, 1).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidRequest { .. }));

        let request = engine.request_for(MapPoint::geographic(-3.7, 40.4), 150.0);
        let err = engine.execute(&request, 2).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn ranks_remote_ahead_of_farther_local() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![point_feature("parcel-7", east_of(MADRID, 2.3), "parcels")],
            true,
        );
        layers.add_remote(roads(), true);
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.reply(
            "roads",
            Reply::Body(
                Duration::ZERO,
                collection(&[("road-1", east_of(MADRID, 1.8))]),
            ),
        );
        let engine = engine(&layers, &fetcher);

        let outcome = engine
            .execute(&engine.request_for(MADRID, 150.0), 4)
            .await
            .unwrap();

        let ranked: Vec<(&str, f64)> = outcome
            .results
            .iter()
            .map(|r| (r.source_id.as_str(), r.distance_km))
            .collect();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "roads");
        assert!((ranked[0].1 - 1.8).abs() < 1e-3, "{ranked:?}");
        assert_eq!(ranked[1].0, "parcels");
        assert!((ranked[1].1 - 2.3).abs() < 1e-3, "{ranked:?}");
        assert_eq!(outcome.generation, 4);
        assert_eq!(outcome.status, OutcomeStatus::Ranked);
    }

    #[tokio::test]
    async fn nearest_local_feature_wins() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![
                point_feature(
                    "far",
                    MapPoint::projected(MADRID.x + 9000.0, MADRID.y),
                    "parcels",
                ),
                point_feature(
                    "near",
                    MapPoint::projected(MADRID.x, MADRID.y + 3000.0),
                    "parcels",
                ),
            ],
            true,
        );
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        let outcome = engine
            .execute(&engine.request_for(MADRID, 150.0), 1)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].feature.id, "near");
        assert!((outcome.results[0].distance_units - 3000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn remote_failure_does_not_affect_local_result() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![point_feature("p1", east_of(MADRID, 0.5), "parcels")],
            true,
        );
        layers.add_remote(roads(), true);
        layers.add_remote(
            SourceDescriptor::remote("rivers", "Rivers", "http://wfs.test", "gis:rivers"),
            true,
        );
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.reply("roads", Reply::Status(500));
        fetcher.reply(
            "rivers",
            Reply::Body(Duration::ZERO, "not json at all".to_string()),
        );
        let engine = engine(&layers, &fetcher);

        let outcome = engine
            .execute(&engine.request_for(MADRID, 150.0), 1)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].source_id, "parcels");
        assert_eq!(outcome.statuses["parcels"], SourceStatus::Matched);
        assert!(matches!(
            &outcome.statuses["roads"],
            SourceStatus::Failed { failure } if failure.is_transport()
        ));
        assert!(matches!(
            &outcome.statuses["rivers"],
            SourceStatus::Failed {
                failure: SourceFailure::RemoteParse { .. }
            }
        ));
        assert_eq!(outcome.summary(), "1 feature found across 3 layers (2 unavailable)");
    }

    #[tokio::test]
    async fn vanished_local_source_is_reported() {
        let layers = Arc::new(InMemoryLayerManager::new());
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        let request = QueryRequest::new(
            MADRID,
            150.0,
            vec![SourceDescriptor::local("deleted", "Deleted")],
        );
        let outcome = engine.execute(&request, 1).await.unwrap();

        assert_eq!(outcome.status, OutcomeStatus::NoCandidatesInRange);
        assert_eq!(
            outcome.statuses["deleted"],
            SourceStatus::Failed {
                failure: SourceFailure::LocalSourceUnavailable {
                    source_id: "deleted".to_string()
                }
            }
        );
    }

    #[tokio::test]
    async fn local_radius_follows_resolution() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![point_feature(
                "p1",
                MapPoint::projected(MADRID.x + 1000.0, MADRID.y),
                "parcels",
            )],
            true,
        );
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        // 10 units/px * 50 px = 500 units: too small.
        let zoomed_in = engine
            .execute(&engine.request_for(MADRID, 10.0), 1)
            .await
            .unwrap();
        assert_eq!(zoomed_in.status, OutcomeStatus::NoCandidatesInRange);
        assert_eq!(zoomed_in.statuses["parcels"], SourceStatus::Empty);

        // 20.5 units/px * 50 px = 1025 units: in range.
        let zoomed_out = engine
            .execute(&engine.request_for(MADRID, 20.5), 2)
            .await
            .unwrap();
        assert_eq!(zoomed_out.results.len(), 1);
    }

    #[tokio::test]
    async fn local_and_remote_share_one_radius() {
        let click = projection::to_projected(MapPoint::geographic(10.0, 60.0));
        let north = MapPoint::projected(click.x, click.y + 12_000.0);
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("wells", "Wells"),
            vec![point_feature("w1", north, "wells")],
            true,
        );
        layers.add_remote(roads(), true);
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.reply(
            "roads",
            Reply::Body(Duration::ZERO, collection(&[("road-1", north)])),
        );
        let engine = engine(&layers, &fetcher);

        // 150 units/px * 50 px = 7500 units; the point is inside the
        // remote bbox but 12000 units away.
        let outcome = engine
            .execute(&engine.request_for(click, 150.0), 1)
            .await
            .unwrap();

        assert_eq!(outcome.statuses["wells"], SourceStatus::Empty);
        assert_eq!(outcome.statuses["roads"], SourceStatus::Empty);
        assert_eq!(outcome.status, OutcomeStatus::NoCandidatesInRange);
    }

    #[tokio::test]
    async fn pixel_tolerance_scales_radius() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![point_feature(
                "p1",
                MapPoint::projected(MADRID.x + 1000.0, MADRID.y),
                "parcels",
            )],
            true,
        );
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher).with_pixel_tolerance(100.0);

        let outcome = engine
            .execute(&engine.request_for(MADRID, 10.0), 1)
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_sources_yield_one_result() {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("parcels", "Parcels"),
            vec![point_feature("p1", east_of(MADRID, 0.1), "parcels")],
            true,
        );
        let fetcher = Arc::new(FakeFetcher::default());
        let engine = engine(&layers, &fetcher);

        let parcels = SourceDescriptor::local("parcels", "Parcels");
        let request = QueryRequest::new(MADRID, 150.0, vec![parcels.clone(), parcels]);
        let outcome = engine.execute(&request, 1).await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.statuses.len(), 1);
    }

    #[tokio::test]
    async fn from_settings_uses_configured_tolerance() {
        let layers: Arc<dyn LayerManager> = Arc::new(InMemoryLayerManager::new());
        let settings = EngineSettings {
            pixel_tolerance: 12.0,
            ..EngineSettings::default()
        };

        let engine = QueryEngine::from_settings(layers, &settings).unwrap();

        assert!((engine.pixel_tolerance() - 12.0).abs() < f64::EPSILON);
    }
}
