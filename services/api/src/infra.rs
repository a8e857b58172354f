use circuit::competition::{
    lifecycle, ChallengeResult, CircuitRepository, ParticipatingPenya, Penya, Prova, ProvaId,
    ProvaTransition, RepositoryError, Season,
};
use circuit::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct SeasonRecords {
    penyes: Vec<Penya>,
    proves: Vec<Prova>,
    participants: HashMap<ProvaId, Vec<ParticipatingPenya>>,
    results: BTreeMap<ProvaId, Vec<ChallengeResult>>,
}

/// Process-local store. A single lock guards every season, so each call,
/// including a lifecycle commit, is applied as one unit.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCircuitRepository {
    seasons: Arc<Mutex<BTreeMap<Season, SeasonRecords>>>,
}

impl InMemoryCircuitRepository {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Season, SeasonRecords>>, RepositoryError> {
        self.seasons
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl CircuitRepository for InMemoryCircuitRepository {
    fn seasons(&self) -> Result<Vec<Season>, RepositoryError> {
        Ok(self.lock()?.keys().copied().collect())
    }

    fn penyes(&self, season: Season) -> Result<Vec<Penya>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&season)
            .map(|records| records.penyes.clone())
            .unwrap_or_default())
    }

    fn insert_penyes(&self, season: Season, penyes: Vec<Penya>) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let records = guard.entry(season).or_default();
        let clash = penyes
            .iter()
            .any(|new| records.penyes.iter().any(|stored| stored.id == new.id));
        if clash {
            return Err(RepositoryError::Conflict);
        }
        records.penyes.extend(penyes);
        Ok(())
    }

    fn update_penya(&self, season: Season, penya: Penya) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard
            .get_mut(&season)
            .and_then(|records| records.penyes.iter_mut().find(|stored| stored.id == penya.id))
            .ok_or(RepositoryError::NotFound)?;
        *stored = penya;
        Ok(())
    }

    fn proves(&self, season: Season) -> Result<Vec<Prova>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&season)
            .map(|records| records.proves.clone())
            .unwrap_or_default())
    }

    fn fetch_prova(&self, season: Season, id: &ProvaId) -> Result<Option<Prova>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&season)
            .and_then(|records| records.proves.iter().find(|prova| &prova.id == id))
            .cloned())
    }

    fn insert_prova(
        &self,
        season: Season,
        prova: Prova,
        participants: Vec<ParticipatingPenya>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let records = guard.entry(season).or_default();
        if records.proves.iter().any(|stored| stored.id == prova.id) {
            return Err(RepositoryError::Conflict);
        }
        records.participants.insert(prova.id.clone(), participants);
        records.proves.push(prova);
        Ok(())
    }

    fn participants(
        &self,
        season: Season,
        id: &ProvaId,
    ) -> Result<Vec<ParticipatingPenya>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&season)
            .and_then(|records| records.participants.get(id).cloned())
            .unwrap_or_default())
    }

    fn update_participant(
        &self,
        season: Season,
        id: &ProvaId,
        participant: ParticipatingPenya,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard
            .get_mut(&season)
            .and_then(|records| records.participants.get_mut(id))
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|entry| entry.penya_id == participant.penya_id)
            })
            .ok_or(RepositoryError::NotFound)?;
        *stored = participant;
        Ok(())
    }

    fn results(
        &self,
        season: Season,
    ) -> Result<BTreeMap<ProvaId, Vec<ChallengeResult>>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&season)
            .map(|records| records.results.clone())
            .unwrap_or_default())
    }

    fn commit_transition(
        &self,
        season: Season,
        id: &ProvaId,
        transition: ProvaTransition,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let records = guard.get_mut(&season).ok_or(RepositoryError::NotFound)?;
        let prova = records
            .proves
            .iter_mut()
            .find(|prova| &prova.id == id)
            .ok_or(RepositoryError::NotFound)?;

        lifecycle::apply(prova, &transition);
        match transition {
            ProvaTransition::Finish { results } => {
                records.results.insert(id.clone(), results);
            }
            ProvaTransition::Reopen => {
                records.results.remove(id);
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_season(raw: &str) -> Result<Season, String> {
    raw.trim()
        .parse::<i32>()
        .map(Season)
        .map_err(|err| format!("failed to parse '{raw}' as a season year ({err})"))
}

/// Reads a JSON snapshot file exported from the store.
pub(crate) fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
