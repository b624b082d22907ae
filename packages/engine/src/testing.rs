//! Fakes shared by the engine tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geoprobe_feature_models::{BoundingBox, Feature, MapPoint, QueryOutcome};
use geoprobe_remote::client::DEFAULT_REMOTE_TIMEOUT;
use geoprobe_remote::{FeatureFetcher, RemoteError, RemoteFeatureQueryClient, RemoteTarget};
use geoprobe_spatial::{distance, projection};

use crate::{HighlightSink, ResultConsumer};

/// Puerta del Sol, Madrid, in the display CRS.
pub const MADRID: MapPoint = MapPoint::projected(-412_305.13, 4_926_696.67);

#[derive(Clone)]
pub enum Reply {
    Body(Duration, String),
    Status(u16),
}

/// Serves canned bodies per source id, optionally after a delay.
#[derive(Default)]
pub struct FakeFetcher {
    replies: Mutex<BTreeMap<String, Reply>>,
}

impl FakeFetcher {
    pub fn reply(&self, source_id: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(source_id.to_string(), reply);
    }
}

#[async_trait::async_trait]
impl FeatureFetcher for FakeFetcher {
    async fn fetch(
        &self,
        target: &RemoteTarget,
        _bbox: &BoundingBox,
    ) -> Result<String, RemoteError> {
        let reply = self.replies.lock().unwrap().get(&target.source_id).cloned();
        match reply {
            Some(Reply::Body(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Status(status)) => Err(RemoteError::Status { status }),
            None => Err(RemoteError::Status { status: 404 }),
        }
    }
}

pub fn remote_client(fetcher: Arc<FakeFetcher>) -> RemoteFeatureQueryClient {
    RemoteFeatureQueryClient::new(fetcher, DEFAULT_REMOTE_TIMEOUT)
}

/// Projected point `km` kilometres (as the engine measures them) due east
/// of `origin`.
pub fn east_of(origin: MapPoint, km: f64) -> MapPoint {
    let lat = projection::to_geographic(origin).y;
    MapPoint::projected(origin.x + distance::km_to_units(km, lat), origin.y)
}

pub fn point_feature(id: &str, at: MapPoint, source: &str) -> Feature {
    Feature::new(id, geo::Point::new(at.x, at.y), source)
}

/// A WGS84 `GeoJSON` collection with one point per `(id, projected point)`.
pub fn collection(points: &[(&str, MapPoint)]) -> String {
    let features: Vec<serde_json::Value> = points
        .iter()
        .map(|(id, at)| {
            let lonlat = projection::to_geographic(*at);
            serde_json::json!({
                "type": "Feature",
                "id": id,
                "geometry": { "type": "Point", "coordinates": [lonlat.x, lonlat.y] },
                "properties": {}
            })
        })
        .collect();
    serde_json::json!({ "type": "FeatureCollection", "features": features }).to_string()
}

/// Records everything delivered to it.
#[derive(Default)]
pub struct RecordingSink {
    pub outcomes: Mutex<Vec<QueryOutcome>>,
    pub highlights: Mutex<Vec<Vec<String>>>,
}

impl RecordingSink {
    pub fn delivered_generations(&self) -> Vec<u64> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.generation)
            .collect()
    }
}

impl ResultConsumer for RecordingSink {
    fn deliver(&self, outcome: &QueryOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

impl HighlightSink for RecordingSink {
    fn highlight(&self, features: &[Feature]) {
        self.highlights
            .lock()
            .unwrap()
            .push(features.iter().map(|f| f.id.clone()).collect());
    }
}
