//! Splits a request's sources by locality.

use std::collections::BTreeSet;

use geoprobe_feature_models::{SourceDescriptor, SourceLocality};
use geoprobe_remote::RemoteTarget;

/// Sources of one request, partitioned by where their features live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedSources {
    /// In-memory sources, in request order.
    pub local: Vec<SourceDescriptor>,
    /// Remote sources, in request order.
    pub remote: Vec<RemoteTarget>,
}

impl ClassifiedSources {
    /// Total number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.remote.len()
    }

    /// Returns `true` if there is nothing to query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.remote.is_empty()
    }
}

/// Partitions sources into local and remote, preserving order.
///
/// A source id that appears more than once is only kept the first time,
/// so every source contributes at most one match.
#[must_use]
pub fn classify(sources: &[SourceDescriptor]) -> ClassifiedSources {
    let mut seen = BTreeSet::new();
    let mut classified = ClassifiedSources::default();

    for source in sources {
        if !seen.insert(source.id.as_str()) {
            log::warn!("Ignoring duplicate source {}", source.id);
            continue;
        }
        match &source.locality {
            SourceLocality::Local => classified.local.push(source.clone()),
            SourceLocality::Remote {
                endpoint,
                type_name,
            } => classified.remote.push(RemoteTarget {
                source_id: source.id.clone(),
                endpoint: endpoint.clone(),
                type_name: type_name.clone(),
            }),
        }
    }

    classified
}
