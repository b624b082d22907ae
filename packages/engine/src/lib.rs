#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nearest-feature query engine.
//!
//! A click becomes a [`QueryRequest`](geoprobe_feature_models::QueryRequest).
//! The engine splits its sources into local and remote, computes the
//! search radius once, searches local sources inline and remote sources
//! concurrently, then ranks the per-source nearest matches by distance.
//!
//! [`QueryEngine`] is stateless and answers one request at a time.
//! [`QuerySession`] wraps it for an interactive map: each new click
//! supersedes the previous one, and only the newest answer ever reaches
//! the highlight and result sinks.

pub mod aggregate;
pub mod classify;
pub mod collaborators;
pub mod engine;
pub mod layers;
pub mod session;

#[cfg(test)]
mod testing;

use thiserror::Error;

pub use collaborators::{FixedViewport, HighlightSink, LayerManager, ResultConsumer, Viewport};
pub use engine::QueryEngine;
pub use layers::InMemoryLayerManager;
pub use session::QuerySession;

/// Errors that stop a whole request.
///
/// Per-source problems never show up here; they are recorded in the
/// outcome's status map instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The request cannot be executed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with it.
        message: String,
    },

    /// A newer request started before this one finished; its results
    /// were discarded.
    #[error("Request {generation} was superseded")]
    Superseded {
        /// Generation of the discarded request.
        generation: u64,
    },
}
