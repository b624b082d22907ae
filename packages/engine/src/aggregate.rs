//! Merges per-source answers into one ranked outcome.

use std::collections::BTreeMap;

use geoprobe_feature_models::{
    MatchResult, OutcomeStatus, QueryOutcome, SourceFailure, SourceStatus,
};

/// What one source answered: its nearest match, nothing in range, or a
/// failure.
pub type SourceAnswer = Result<Option<MatchResult>, SourceFailure>;

/// Builds the ranked outcome of a request.
///
/// Matches are sorted ascending by `distance_km`. The sort is stable, so
/// equal distances keep input order: local answers first, then remote,
/// each in request order. Matches from different sources are never
/// merged even if they describe the same real-world object.
#[must_use]
pub fn aggregate<L, R>(generation: u64, local: L, remote: R) -> QueryOutcome
where
    L: IntoIterator<Item = (String, SourceAnswer)>,
    R: IntoIterator<Item = (String, SourceAnswer)>,
{
    let mut results = Vec::new();
    let mut statuses = BTreeMap::new();

    for (source_id, answer) in local.into_iter().chain(remote) {
        let status = match answer {
            Ok(Some(result)) => {
                results.push(result);
                SourceStatus::Matched
            }
            Ok(None) => SourceStatus::Empty,
            Err(failure) => SourceStatus::Failed { failure },
        };
        statuses.insert(source_id, status);
    }

    results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    let status = if statuses.is_empty() {
        OutcomeStatus::NoVisibleSources
    } else if results.is_empty() {
        OutcomeStatus::NoCandidatesInRange
    } else {
        OutcomeStatus::Ranked
    };

    QueryOutcome {
        generation,
        results,
        statuses,
        status,
    }
}
