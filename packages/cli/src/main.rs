#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line nearest-feature queries.
//!
//! ```text
//! geoprobe sources [--config geoprobe.toml]
//! geoprobe identify --x -412305 --y 4926696 [--resolution 150] [--sources a,b] [--json]
//! geoprobe identify --lon -3.7038 --lat 40.4168
//! ```
//!
//! The config file defaults to `$GEOPROBE_CONFIG` or `geoprobe.toml`.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use geoprobe_config::ProbeConfig;
use geoprobe_engine::{FixedViewport, InMemoryLayerManager, QueryEngine, QuerySession};
use geoprobe_feature_models::{InteractionMode, MapPoint};
use geoprobe_server_models::IdentifyParams;

use crate::output::{OutputFormat, TerminalSink};

#[derive(Parser)]
#[command(name = "geoprobe", about = "Find the nearest feature in every map layer")]
struct Cli {
    /// Path to the TOML config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sources
    Sources,
    /// Find the nearest feature of every visible source around a point
    Identify {
        /// Click x in the display CRS (EPSG:3857)
        #[arg(long, allow_negative_numbers = true, requires = "y")]
        x: Option<f64>,
        /// Click y in the display CRS (EPSG:3857)
        #[arg(long, allow_negative_numbers = true, requires = "x")]
        y: Option<f64>,
        /// Click longitude (WGS84)
        #[arg(long, allow_negative_numbers = true, requires = "lat", conflicts_with = "x")]
        lon: Option<f64>,
        /// Click latitude (WGS84)
        #[arg(long, allow_negative_numbers = true, requires = "lon", conflicts_with = "y")]
        lat: Option<f64>,
        /// Display units per pixel (defaults to the configured viewport)
        #[arg(long)]
        resolution: Option<f64>,
        /// Comma-separated source ids to query instead of the visible ones
        #[arg(long)]
        sources: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(geoprobe_config::default_path);
    let config = geoprobe_config::load(&config_path)?;

    match cli.command {
        Commands::Sources => print!("{}", output::format_sources(&config)),
        Commands::Identify {
            x,
            y,
            lon,
            lat,
            resolution,
            sources,
            json,
        } => {
            let params = IdentifyParams {
                x,
                y,
                lon,
                lat,
                resolution,
                sources,
            };
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Table
            };
            identify(&config, &params, format).await?;
        }
    }

    Ok(())
}

async fn identify(
    config: &ProbeConfig,
    params: &IdentifyParams,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let click = params.click()?;

    let layers = Arc::new(InMemoryLayerManager::from_config(config)?);
    if let Some(filter) = params.source_filter() {
        let unknown = unknown_sources(config, &filter);
        if !unknown.is_empty() {
            return Err(format!("Unknown source(s): {}", unknown.join(", ")).into());
        }
        for (descriptor, _) in layers.sources() {
            layers.set_visible(&descriptor.id, filter.contains(&descriptor.id));
        }
    }

    let engine = Arc::new(QueryEngine::from_settings(layers.clone(), &config.engine)?);
    let [cx, cy] = config.viewport.center;
    let viewport = FixedViewport::new(
        params.resolution.unwrap_or(config.viewport.resolution),
        MapPoint::projected(cx, cy),
    );
    let sink = Arc::new(TerminalSink::new(layers.clone(), format));
    let session = QuerySession::new(engine, Arc::new(viewport), sink.clone(), sink);

    session.handle_click(InteractionMode::Identify, click).await?;

    Ok(())
}

/// Ids in `filter` that no configured source has.
fn unknown_sources<'a>(config: &ProbeConfig, filter: &'a [String]) -> Vec<&'a str> {
    filter
        .iter()
        .filter(|id| config.source(id).is_none())
        .map(String::as_str)
        .collect()
}
