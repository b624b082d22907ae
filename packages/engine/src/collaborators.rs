//! Interfaces the engine needs from the surrounding application.

use std::sync::Arc;

use geoprobe_feature_models::{Feature, MapPoint, QueryOutcome, SourceDescriptor};
use geoprobe_spatial::FeatureSnapshot;

/// Knows which sources exist, which are visible, and holds the features
/// of local sources.
pub trait LayerManager: Send + Sync {
    /// Sources currently visible, in display order.
    fn visible_sources(&self) -> Vec<SourceDescriptor>;

    /// Current snapshot of a local source's features, or `None` if the
    /// source no longer exists, is hidden, or is not local.
    fn local_features(&self, source_id: &str) -> Option<Arc<FeatureSnapshot>>;

    /// Display name of a source.
    fn display_name(&self, source_id: &str) -> Option<String>;
}

/// Current map view.
pub trait Viewport: Send + Sync {
    /// Display units per pixel.
    fn resolution(&self) -> f64;

    /// Centre of the view in the display CRS.
    ///
    /// Only used for diagnostics. Kilometre distances are corrected at the
    /// click latitude, which stays accurate when the click is far from the
    /// centre of a zoomed-out view.
    fn center(&self) -> MapPoint;
}

/// Receives the features to highlight on the map.
pub trait HighlightSink: Send + Sync {
    /// Replaces the current highlight. An empty slice clears it.
    fn highlight(&self, features: &[Feature]);
}

/// Receives finished query outcomes.
pub trait ResultConsumer: Send + Sync {
    /// Called once per delivered outcome, newest request only.
    fn deliver(&self, outcome: &QueryOutcome);
}

/// A viewport that never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedViewport {
    /// Display units per pixel.
    pub resolution: f64,
    /// Centre in the display CRS.
    pub center: MapPoint,
}

impl FixedViewport {
    /// Creates a viewport at `center` with the given resolution.
    #[must_use]
    pub const fn new(resolution: f64, center: MapPoint) -> Self {
        Self { resolution, center }
    }
}

impl Viewport for FixedViewport {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn center(&self) -> MapPoint {
        self.center
    }
}
