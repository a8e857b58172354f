use std::collections::BTreeMap;

use super::domain::{ChallengeResult, ParticipatingPenya, Penya, Prova, ProvaId, Season};
use super::lifecycle::ProvaTransition;

/// Persistence collaborator. Implementations own the schema; the engine only
/// reads snapshots and hands back results.
pub trait CircuitRepository: Send + Sync {
    fn seasons(&self) -> Result<Vec<Season>, RepositoryError>;

    fn penyes(&self, season: Season) -> Result<Vec<Penya>, RepositoryError>;
    /// Inserts all teams or none; an existing id is a conflict.
    fn insert_penyes(&self, season: Season, penyes: Vec<Penya>) -> Result<(), RepositoryError>;
    fn update_penya(&self, season: Season, penya: Penya) -> Result<(), RepositoryError>;

    fn proves(&self, season: Season) -> Result<Vec<Prova>, RepositoryError>;
    fn fetch_prova(&self, season: Season, id: &ProvaId) -> Result<Option<Prova>, RepositoryError>;
    /// Inserts the event together with its entry list in one commit.
    fn insert_prova(
        &self,
        season: Season,
        prova: Prova,
        participants: Vec<ParticipatingPenya>,
    ) -> Result<(), RepositoryError>;

    fn participants(
        &self,
        season: Season,
        id: &ProvaId,
    ) -> Result<Vec<ParticipatingPenya>, RepositoryError>;
    fn update_participant(
        &self,
        season: Season,
        id: &ProvaId,
        participant: ParticipatingPenya,
    ) -> Result<(), RepositoryError>;

    /// Frozen results keyed by event.
    fn results(
        &self,
        season: Season,
    ) -> Result<BTreeMap<ProvaId, Vec<ChallengeResult>>, RepositoryError>;

    /// Writes the results change and the finished flag as one atomic unit.
    /// On error nothing may have changed.
    fn commit_transition(
        &self,
        season: Season,
        id: &ProvaId,
        transition: ProvaTransition,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
