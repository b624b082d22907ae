//! Interactive query session: newest click wins.
//!
//! Every submitted request gets the next generation number and aborts
//! whatever request was still in flight. A request only reaches the sinks
//! if its generation is still the newest when it finishes; otherwise it
//! resolves to [`ProbeError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{AbortHandle, abortable};
use geoprobe_feature_models::{InteractionMode, MapPoint, QueryOutcome, QueryRequest};

use crate::{HighlightSink, ProbeError, QueryEngine, ResultConsumer, Viewport};

/// Drives a [`QueryEngine`] from map clicks and delivers the newest
/// outcome to a highlight sink and a result consumer.
pub struct QuerySession {
    engine: Arc<QueryEngine>,
    viewport: Arc<dyn Viewport>,
    highlight: Arc<dyn HighlightSink>,
    consumer: Arc<dyn ResultConsumer>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("engine", &self.engine)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl QuerySession {
    /// Creates a session.
    #[must_use]
    pub fn new(
        engine: Arc<QueryEngine>,
        viewport: Arc<dyn Viewport>,
        highlight: Arc<dyn HighlightSink>,
        consumer: Arc<dyn ResultConsumer>,
    ) -> Self {
        Self {
            engine,
            viewport,
            highlight,
            consumer,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Generation of the most recently submitted request (0 before the
    /// first one).
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Handles a click on the map.
    ///
    /// In [`InteractionMode::Drawing`] the click belongs to the drawing tool
    /// and nothing is queried. Otherwise a request is built against the
    /// currently visible sources at the viewport's resolution and
    /// submitted.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn handle_click(
        &self,
        mode: InteractionMode,
        click: MapPoint,
    ) -> Result<Option<QueryOutcome>, ProbeError> {
        match mode {
            InteractionMode::Drawing => {
                log::debug!("Click at ({}, {}) ignored while drawing", click.x, click.y);
                Ok(None)
            }
            InteractionMode::Identify => {
                let center = self.viewport.center();
                log::debug!(
                    "Identify at ({}, {}), view centred on ({}, {})",
                    click.x,
                    click.y,
                    center.x,
                    center.y
                );
                let request = self
                    .engine
                    .request_for(click, self.viewport.resolution());
                self.submit(request).await.map(Some)
            }
        }
    }

    /// Runs a request, superseding any request still in flight.
    ///
    /// On success the outcome has already been delivered: highlighted
    /// features first, then the outcome itself.
    ///
    /// # Errors
    ///
    /// * [`ProbeError::InvalidRequest`] if the request fails validation.
    /// * [`ProbeError::Superseded`] if a newer request was submitted before
    ///   this one finished. Nothing is delivered in that case.
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryOutcome, ProbeError> {
        let (task, generation) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let (task, handle) = abortable(self.engine.execute(&request, generation));
            if let Some(previous) = in_flight.replace(handle) {
                log::debug!("Request {generation} supersedes the request in flight");
                previous.abort();
            }
            (task, generation)
        };

        let outcome = match task.await {
            Ok(result) => result?,
            Err(_aborted) => {
                log::debug!("Request {generation} aborted");
                return Err(ProbeError::Superseded { generation });
            }
        };

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding stale request {generation}");
            return Err(ProbeError::Superseded { generation });
        }
        in_flight.take();

        self.highlight.highlight(&outcome.features());
        self.consumer.deliver(&outcome);
        drop(in_flight);

        Ok(outcome)
    }
}
