//! Copy-on-write feature storage for local sources.
//!
//! A [`LocalFeatureStore`] hands out immutable [`FeatureSnapshot`]s. Edits
//! build a fresh snapshot and swap it in, so a scan that started before
//! the edit keeps reading the old, complete state.

use std::sync::{Arc, PoisonError, RwLock};

use geo::BoundingRect;
use geoprobe_feature_models::Feature;
use rstar::{AABB, RTree, RTreeObject};

/// A feature's envelope stored in the R-tree, pointing back at its
/// position in the snapshot.
struct FeatureEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An immutable view of one local source's features.
///
/// Features keep their insertion order; the R-tree only narrows which of
/// them need an exact distance check.
pub struct FeatureSnapshot {
    features: Vec<Feature>,
    index: RTree<FeatureEntry>,
}

impl FeatureSnapshot {
    /// Builds a snapshot (and its spatial index) from features in storage order.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        let entries = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                compute_envelope(&feature.geometry).map(|envelope| FeatureEntry { index, envelope })
            })
            .collect();

        Self {
            features,
            index: RTree::bulk_load(entries),
        }
    }

    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Features in storage order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the snapshot holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose envelope lies within `radius` of `(x, y)` on either
    /// axis, as `(storage_index, feature)` pairs in no particular order.
    pub fn candidates_near(
        &self,
        x: f64,
        y: f64,
        radius: f64,
    ) -> impl Iterator<Item = (usize, &Feature)> {
        let query_env = AABB::from_corners([x - radius, y - radius], [x + radius, y + radius]);
        self.index
            .locate_in_envelope_intersecting(&query_env)
            .map(|entry| (entry.index, &self.features[entry.index]))
    }
}

impl std::fmt::Debug for FeatureSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureSnapshot")
            .field("features", &self.features.len())
            .finish()
    }
}

/// Thread-safe holder of the current snapshot of a local source.
#[derive(Debug)]
pub struct LocalFeatureStore {
    current: RwLock<Arc<FeatureSnapshot>>,
}

impl Default for LocalFeatureStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LocalFeatureStore {
    /// Creates a store holding `features`.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            current: RwLock::new(Arc::new(FeatureSnapshot::new(features))),
        }
    }

    /// Returns the current snapshot. Cheap: clones an `Arc`.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FeatureSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces every feature at once.
    pub fn replace(&self, features: Vec<Feature>) {
        let next = Arc::new(FeatureSnapshot::new(features));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Appends one feature (e.g. a user edit).
    pub fn insert(&self, feature: Feature) {
        self.update(|features| features.push(feature));
    }

    /// Removes the feature with the given id. Returns `true` if one was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut removed = false;
        self.update(|features| {
            let before = features.len();
            features.retain(|f| f.id != id);
            removed = features.len() != before;
        });
        removed
    }

    /// Applies an edit to a copy of the features and publishes the result.
    ///
    /// The write lock is held for the whole edit so concurrent edits are
    /// serialised; readers holding an older snapshot are unaffected.
    fn update(&self, edit: impl FnOnce(&mut Vec<Feature>)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut features = guard.features.clone();
        edit(&mut features);
        *guard = Arc::new(FeatureSnapshot::new(features));
    }
}

/// Compute the bounding box envelope for a geometry.
fn compute_envelope(geometry: &geo::Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry.bounding_rect().map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}
