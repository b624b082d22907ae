//! Terminal rendering of query outcomes.

use std::fmt::Write as _;
use std::sync::Arc;

use geoprobe_config::{ProbeConfig, SourceKind};
use geoprobe_engine::{HighlightSink, InMemoryLayerManager, LayerManager as _, ResultConsumer};
use geoprobe_feature_models::{Feature, QueryOutcome};
use geoprobe_server_models::ApiOutcome;

/// How outcomes are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Prints delivered outcomes to stdout.
pub struct TerminalSink {
    layers: Arc<InMemoryLayerManager>,
    format: OutputFormat,
}

impl TerminalSink {
    pub const fn new(layers: Arc<InMemoryLayerManager>, format: OutputFormat) -> Self {
        Self { layers, format }
    }
}

impl HighlightSink for TerminalSink {
    fn highlight(&self, features: &[Feature]) {
        log::debug!("Highlighting {} features", features.len());
    }
}

impl ResultConsumer for TerminalSink {
    fn deliver(&self, outcome: &QueryOutcome) {
        let name_of = |id: &str| self.layers.display_name(id);
        match self.format {
            OutputFormat::Table => print!("{}", format_outcome(outcome, name_of)),
            OutputFormat::Json => {
                let api = ApiOutcome::new(outcome, name_of);
                match serde_json::to_string_pretty(&api) {
                    Ok(json) => println!("{json}"),
                    Err(e) => log::error!("Failed to serialize outcome: {e}"),
                }
            }
        }
    }
}

/// Renders an outcome as a ranked table followed by the summary and any
/// failed sources.
pub fn format_outcome(outcome: &QueryOutcome, name_of: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::new();

    if !outcome.results.is_empty() {
        let _ = writeln!(out, "{:<4} {:>10}  {:<24} FEATURE", "#", "KM", "LAYER");
        let _ = writeln!(out, "{}", "-".repeat(60));
        for (i, result) in outcome.results.iter().enumerate() {
            let layer = name_of(&result.source_id).unwrap_or_else(|| result.source_id.clone());
            let _ = writeln!(
                out,
                "{:<4} {:>10.3}  {:<24} {}",
                i + 1,
                result.distance_km,
                layer,
                result.feature.id
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", outcome.summary());
    for (source_id, failure) in outcome.failed_sources() {
        let _ = writeln!(out, "  {source_id}: {failure}");
    }

    out
}

/// Renders the configured sources.
pub fn format_sources(config: &ProbeConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:<24} {:<8} {:<8} LOCATION", "ID", "NAME", "KIND", "VISIBLE");
    let _ = writeln!(out, "{}", "-".repeat(80));

    for source in &config.sources {
        let (kind, location) = match &source.kind {
            SourceKind::Local { path } => ("local", path.display().to_string()),
            SourceKind::Remote {
                endpoint,
                type_name,
            } => ("remote", format!("{endpoint} ({type_name})")),
        };
        let visible = if source.visible { "yes" } else { "no" };
        let _ = writeln!(
            out,
            "{:<16} {:<24} {kind:<8} {visible:<8} {location}",
            source.id, source.name
        );
    }

    let _ = writeln!(out, "\n{} source(s)", config.sources.len());
    out
}
