#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for geoprobe.
//!
//! Serves nearest-feature queries over HTTP. Sources and engine settings
//! come from the TOML config (see [`geoprobe_config::default_path`]).
//! Every HTTP request is answered independently; requests from different
//! clients never supersede each other.

mod handlers;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use geoprobe_config::{ConfigError, ProbeConfig, ViewportSettings};
use geoprobe_engine::{InMemoryLayerManager, QueryEngine};
use geoprobe_remote::RemoteError;
use thiserror::Error;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration or source data could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The remote client could not be built.
    #[error("Remote client error: {0}")]
    Remote(#[from] RemoteError),
}

/// Shared application state.
pub struct AppState {
    /// Query engine.
    pub engine: Arc<QueryEngine>,
    /// Layer list backing the engine.
    pub layers: Arc<InMemoryLayerManager>,
    /// Defaults for requests that omit viewport fields.
    pub viewport: ViewportSettings,
    requests: AtomicU64,
}

impl AppState {
    /// Creates state around an existing engine and layer list.
    #[must_use]
    pub const fn new(
        engine: Arc<QueryEngine>,
        layers: Arc<InMemoryLayerManager>,
        viewport: ViewportSettings,
    ) -> Self {
        Self {
            engine,
            layers,
            viewport,
            requests: AtomicU64::new(0),
        }
    }

    /// Loads every source in `config` and builds a WFS-backed engine.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if a local source cannot be loaded or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ServerError> {
        let layers = Arc::new(InMemoryLayerManager::from_config(config)?);
        let engine = QueryEngine::from_settings(layers.clone(), &config.engine)?;
        Ok(Self::new(
            Arc::new(engine),
            layers,
            config.viewport.clone(),
        ))
    }

    /// Number for the next identify request, used to correlate logs.
    fn next_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/sources", web::get().to(handlers::sources))
            .route("/identify", web::get().to(handlers::identify)),
    );
}

/// Starts the HTTP server.
///
/// Loads the config from [`geoprobe_config::default_path`], then binds to
/// `BIND_ADDR`:`PORT` (default `127.0.0.1:8080`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the config cannot be loaded, the
/// HTTP server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config_path = geoprobe_config::default_path();
    let config = geoprobe_config::load(&config_path).map_err(std::io::Error::other)?;
    let state = web::Data::new(AppState::from_config(&config).map_err(std::io::Error::other)?);
    log::info!(
        "Serving {} sources ({} visible)",
        state.layers.sources().len(),
        state
            .layers
            .sources()
            .iter()
            .filter(|(_, visible)| *visible)
            .count()
    );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
