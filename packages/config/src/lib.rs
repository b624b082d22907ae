#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration for geoprobe.
//!
//! A single TOML file describes the engine settings, the initial viewport,
//! and every source the layer manager knows about. Local sources point at
//! a `GeoJSON` file in WGS84; remote sources point at a WFS endpoint and
//! feature type.
//!
//! ```toml
//! [engine]
//! pixel_tolerance = 50
//!
//! [[sources]]
//! id = "roads"
//! name = "Roads"
//! [sources.kind]
//! type = "remote"
//! endpoint = "http://localhost:8080/geoserver/wfs"
//! type_name = "gis:roads"
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use geoprobe_feature_models::{Feature, SourceDescriptor};
use geoprobe_spatial::decode::{self, GeoJsonError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "GEOPROBE_CONFIG";

/// Config file used when [`CONFIG_ENV_VAR`] is not set.
pub const DEFAULT_CONFIG_FILE: &str = "geoprobe.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`ProbeConfig`].
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but is not usable.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },

    /// A local source file is not a `GeoJSON` feature collection.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] GeoJsonError),
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Click tolerance in screen pixels.
    pub pixel_tolerance: f64,
    /// Per-source timeout for remote queries, in milliseconds.
    pub remote_timeout_ms: u64,
    /// Retries for transient remote failures.
    pub max_retries: u32,
    /// WFS protocol version sent with `GetFeature`.
    pub wfs_version: String,
    /// `User-Agent` for remote requests.
    pub user_agent: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pixel_tolerance: geoprobe_spatial::DEFAULT_PIXEL_TOLERANCE,
            remote_timeout_ms: 10_000,
            max_retries: 2,
            wfs_version: "1.0.0".to_string(),
            user_agent: concat!("geoprobe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineSettings {
    /// Remote timeout as a [`Duration`].
    #[must_use]
    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

/// Initial viewport state used by the CLI and server when a request does
/// not carry its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Display units per pixel.
    pub resolution: f64,
    /// Centre in the display CRS.
    pub center: [f64; 2],
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            resolution: 150.0,
            center: [0.0, 0.0],
        }
    }
}

/// Where a configured source gets its features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// A `GeoJSON` file loaded into memory at startup.
    Local {
        /// Path to the file. Relative paths are resolved against the
        /// config file's directory by [`load`].
        path: PathBuf,
    },
    /// A WFS feature type.
    Remote {
        /// Base URL of the WFS endpoint.
        endpoint: String,
        /// Qualified feature type name.
        type_name: String,
    },
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the source starts visible.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Where features come from.
    pub kind: SourceKind,
}

const fn default_visible() -> bool {
    true
}

impl SourceDefinition {
    /// The engine-facing descriptor for this source.
    #[must_use]
    pub fn descriptor(&self) -> SourceDescriptor {
        match &self.kind {
            SourceKind::Local { .. } => SourceDescriptor::local(&self.id, &self.name),
            SourceKind::Remote {
                endpoint,
                type_name,
            } => SourceDescriptor::remote(&self.id, &self.name, endpoint, type_name),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Initial viewport.
    #[serde(default)]
    pub viewport: ViewportSettings,
    /// Configured sources, in display order.
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
}

impl ProbeConfig {
    /// Checks the config for problems serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on duplicate or empty source ids,
    /// empty names or remote fields, or non-positive tolerance, timeout or
    /// resolution.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if !self.engine.pixel_tolerance.is_finite() || self.engine.pixel_tolerance <= 0.0 {
            return invalid(format!(
                "engine.pixel_tolerance must be positive, got {}",
                self.engine.pixel_tolerance
            ));
        }
        if self.engine.remote_timeout_ms == 0 {
            return invalid("engine.remote_timeout_ms must be positive".to_string());
        }
        if !self.viewport.resolution.is_finite() || self.viewport.resolution <= 0.0 {
            return invalid(format!(
                "viewport.resolution must be positive, got {}",
                self.viewport.resolution
            ));
        }

        let mut seen = BTreeSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return invalid("source id must not be empty".to_string());
            }
            if !seen.insert(source.id.as_str()) {
                return invalid(format!("duplicate source id {:?}", source.id));
            }
            if source.name.trim().is_empty() {
                return invalid(format!("source {:?} has an empty name", source.id));
            }
            if let SourceKind::Remote {
                endpoint,
                type_name,
            } = &source.kind
            {
                if endpoint.trim().is_empty() || type_name.trim().is_empty() {
                    return invalid(format!(
                        "remote source {:?} needs an endpoint and a type_name",
                        source.id
                    ));
                }
            }
        }

        Ok(())
    }

    /// Looks up a source by id.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&SourceDefinition> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Resolves relative local source paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            if let SourceKind::Local { path } = &mut source.kind {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// Parses and validates a config from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML is malformed or fails validation.
pub fn from_toml_str(toml_str: &str) -> Result<ProbeConfig, ConfigError> {
    let config: ProbeConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates the config file at `path`.
///
/// Relative local source paths are resolved against the file's directory.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load(path: &Path) -> Result<ProbeConfig, ConfigError> {
    log::info!("Loading config from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let mut config = from_toml_str(&text)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    log::debug!("Loaded {} sources", config.sources.len());
    Ok(config)
}

/// Config location: `$GEOPROBE_CONFIG` if set, else `geoprobe.toml`.
#[must_use]
pub fn default_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// Loads the features of a local source from a WGS84 `GeoJSON` file,
/// reprojected into the display CRS.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or is not a
/// `GeoJSON` feature collection.
pub fn load_local_features(path: &Path, source_id: &str) -> Result<Vec<Feature>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let features = decode::parse_feature_collection(&text, source_id, source_id)?;
    log::info!(
        "Loaded {} features for {source_id} from {}",
        features.len(),
        path.display()
    );
    Ok(features)
}
