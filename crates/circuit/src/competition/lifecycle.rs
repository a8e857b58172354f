use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ChallengeResult, ParticipatingPenya, Prova, ProvaId, ProvaStatus};
use super::ranker::{self, RankingError};

/// State change to commit atomically together with its results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum ProvaTransition {
    /// Freeze the computed results and mark the event finished.
    Finish { results: Vec<ChallengeResult> },
    /// Delete the frozen results and mark the event open again.
    Reopen,
}

impl ProvaTransition {
    pub fn target(&self) -> ProvaStatus {
        match self {
            Self::Finish { .. } => ProvaStatus::Finished,
            Self::Reopen => ProvaStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LifecycleError {
    #[error("event {0} is already finished")]
    AlreadyFinished(ProvaId),
    #[error("event {0} is not finished")]
    NotFinished(ProvaId),
    #[error("event {prova_id} has {} team(s) without a result", .missing.len())]
    IncompleteResults {
        prova_id: ProvaId,
        missing: Vec<String>,
    },
    #[error(transparent)]
    Ranking(#[from] RankingError),
}

/// Results may only change while the event is open.
pub fn ensure_open(prova: &Prova) -> Result<(), LifecycleError> {
    match prova.status() {
        ProvaStatus::Open => Ok(()),
        ProvaStatus::Finished => Err(LifecycleError::AlreadyFinished(prova.id.clone())),
    }
}

/// Names of participating teams that would not be ranked if the event
/// closed now.
pub fn missing_results(prova: &Prova, entries: &[ParticipatingPenya]) -> Vec<String> {
    ranker::unranked_participants(entries, prova.challenge_type)
        .into_iter()
        .map(|entry| entry.name.clone())
        .collect()
}

/// Plans the `Open -> Finished` transition.
///
/// Incomplete results stop the close unless `force` is set; the caller shows
/// the missing teams and may retry with `force`.
pub fn close(
    prova: &Prova,
    entries: &[ParticipatingPenya],
    force: bool,
) -> Result<ProvaTransition, LifecycleError> {
    ensure_open(prova)?;

    let missing = missing_results(prova, entries);
    if !missing.is_empty() {
        if !force {
            return Err(LifecycleError::IncompleteResults {
                prova_id: prova.id.clone(),
                missing,
            });
        }
        warn!(
            prova = %prova.id,
            missing = missing.len(),
            "closing event with incomplete results"
        );
    }

    let results = ranker::rank(
        entries,
        prova.challenge_type,
        prova.win_direction,
        &prova.points_range,
    )?;

    info!(prova = %prova.id, ranked = results.len(), "event results computed");
    Ok(ProvaTransition::Finish { results })
}

/// Plans the `Finished -> Open` transition, discarding the frozen results.
pub fn reopen(prova: &Prova) -> Result<ProvaTransition, LifecycleError> {
    match prova.status() {
        ProvaStatus::Finished => {
            info!(prova = %prova.id, "event reopened; results discarded");
            Ok(ProvaTransition::Reopen)
        }
        ProvaStatus::Open => Err(LifecycleError::NotFinished(prova.id.clone())),
    }
}

/// Applies a committed transition to the in-memory event record.
pub fn apply(prova: &mut Prova, transition: &ProvaTransition) {
    prova.is_finished = transition.target() == ProvaStatus::Finished;
}
