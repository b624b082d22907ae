//! In-memory [`LayerManager`] built from configuration.

use std::sync::{Arc, PoisonError, RwLock};

use geoprobe_config::{ConfigError, ProbeConfig, SourceKind};
use geoprobe_feature_models::{Feature, Locality, SourceDescriptor};
use geoprobe_spatial::{FeatureSnapshot, LocalFeatureStore};

use crate::LayerManager;

#[derive(Debug)]
struct Layer {
    descriptor: SourceDescriptor,
    visible: bool,
    store: Option<Arc<LocalFeatureStore>>,
}

/// A layer list held in memory.
///
/// Local layers own a [`LocalFeatureStore`]; remote layers only carry
/// their descriptor. Layers can be added, removed and toggled while
/// queries run: a query that already holds a snapshot keeps using it.
#[derive(Debug, Default)]
pub struct InMemoryLayerManager {
    layers: RwLock<Vec<Layer>>,
}

impl InMemoryLayerManager {
    /// Creates an empty layer list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the layer list described by `config`, loading every local
    /// source's `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a local source file cannot be read or
    /// parsed.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ConfigError> {
        let manager = Self::new();

        for source in &config.sources {
            let descriptor = source.descriptor();
            match &source.kind {
                SourceKind::Local { path } => {
                    let features = geoprobe_config::load_local_features(path, &source.id)?;
                    manager.add_local(descriptor, features, source.visible);
                }
                SourceKind::Remote { .. } => manager.add_remote(descriptor, source.visible),
            }
        }

        Ok(manager)
    }

    /// Adds (or replaces) a local layer and returns its store.
    pub fn add_local(
        &self,
        descriptor: SourceDescriptor,
        features: Vec<Feature>,
        visible: bool,
    ) -> Arc<LocalFeatureStore> {
        let store = Arc::new(LocalFeatureStore::new(features));
        self.insert(Layer {
            descriptor,
            visible,
            store: Some(store.clone()),
        });
        store
    }

    /// Adds (or replaces) a remote layer.
    pub fn add_remote(&self, descriptor: SourceDescriptor, visible: bool) {
        self.insert(Layer {
            descriptor,
            visible,
            store: None,
        });
    }

    /// Shows or hides a layer. Returns `false` if it does not exist.
    pub fn set_visible(&self, source_id: &str, visible: bool) -> bool {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter_mut()
            .find(|l| l.descriptor.id == source_id)
            .is_some_and(|layer| {
                layer.visible = visible;
                true
            })
    }

    /// Removes a layer. Returns `false` if it did not exist.
    pub fn remove(&self, source_id: &str) -> bool {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        let before = layers.len();
        layers.retain(|l| l.descriptor.id != source_id);
        layers.len() != before
    }

    /// The feature store of a local layer, visible or not.
    #[must_use]
    pub fn store(&self, source_id: &str) -> Option<Arc<LocalFeatureStore>> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter()
            .find(|l| l.descriptor.id == source_id)
            .and_then(|l| l.store.clone())
    }

    /// Every layer with its visibility, in display order.
    #[must_use]
    pub fn sources(&self) -> Vec<(SourceDescriptor, bool)> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter()
            .map(|l| (l.descriptor.clone(), l.visible))
            .collect()
    }

    fn insert(&self, layer: Layer) {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = layers
            .iter_mut()
            .find(|l| l.descriptor.id == layer.descriptor.id)
        {
            log::debug!("Replacing layer {}", layer.descriptor.id);
            *existing = layer;
        } else {
            layers.push(layer);
        }
    }
}

impl LayerManager for InMemoryLayerManager {
    fn visible_sources(&self) -> Vec<SourceDescriptor> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.descriptor.clone())
            .collect()
    }

    fn local_features(&self, source_id: &str) -> Option<Arc<FeatureSnapshot>> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter()
            .find(|l| {
                l.descriptor.id == source_id
                    && l.visible
                    && l.descriptor.kind() == Locality::Local
            })
            .and_then(|l| l.store.as_ref())
            .map(|store| store.snapshot())
    }

    fn display_name(&self, source_id: &str) -> Option<String> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .iter()
            .find(|l| l.descriptor.id == source_id)
            .map(|l| l.descriptor.name.clone())
    }
}
