use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::competition::domain::{
    ChallengeResult, ChallengeType, ParticipatingPenya, Penya, PenyaId, Prova, ProvaId, Season,
    WinDirection,
};
use crate::competition::lifecycle::{self, ProvaTransition};
use crate::competition::points::{PointsRange, PointsTable};
use crate::competition::repository::{CircuitRepository, RepositoryError};
use crate::competition::roster::NewPenya;
use crate::competition::service::{CircuitService, NewProva, PenyaSelection};
use crate::competition::circuit_router;

pub(super) const SEASON: Season = Season(2025);

#[derive(Default)]
pub(super) struct SeasonData {
    pub(super) penyes: Vec<Penya>,
    pub(super) proves: Vec<Prova>,
    pub(super) participants: HashMap<ProvaId, Vec<ParticipatingPenya>>,
    pub(super) results: BTreeMap<ProvaId, Vec<ChallengeResult>>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) seasons: Arc<Mutex<BTreeMap<Season, SeasonData>>>,
    pub(super) fail_commits: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub(super) fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub(super) fn stored_prova(&self, season: Season, id: &str) -> Prova {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        guard[&season]
            .proves
            .iter()
            .find(|prova| prova.id.0 == id)
            .cloned()
            .expect("stored event")
    }
}

impl CircuitRepository for MemoryRepository {
    fn seasons(&self) -> Result<Vec<Season>, RepositoryError> {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard.keys().copied().collect())
    }

    fn penyes(&self, season: Season) -> Result<Vec<Penya>, RepositoryError> {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&season)
            .map(|data| data.penyes.clone())
            .unwrap_or_default())
    }

    fn insert_penyes(&self, season: Season, penyes: Vec<Penya>) -> Result<(), RepositoryError> {
        let mut guard = self.seasons.lock().expect("repository mutex poisoned");
        let data = guard.entry(season).or_default();
        if penyes
            .iter()
            .any(|new| data.penyes.iter().any(|penya| penya.id == new.id))
        {
            return Err(RepositoryError::Conflict);
        }
        data.penyes.extend(penyes);
        Ok(())
    }

    fn update_penya(&self, season: Season, penya: Penya) -> Result<(), RepositoryError> {
        let mut guard = self.seasons.lock().expect("repository mutex poisoned");
        let stored = guard
            .get_mut(&season)
            .and_then(|data| data.penyes.iter_mut().find(|stored| stored.id == penya.id))
            .ok_or(RepositoryError::NotFound)?;
        *stored = penya;
        Ok(())
    }

    fn proves(&self, season: Season) -> Result<Vec<Prova>, RepositoryError> {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&season)
            .map(|data| data.proves.clone())
            .unwrap_or_default())
    }

    fn fetch_prova(&self, season: Season, id: &ProvaId) -> Result<Option<Prova>, RepositoryError> {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&season)
            .and_then(|data| data.proves.iter().find(|prova| &prova.id == id).cloned()))
    }

    fn insert_prova(
        &self,
        season: Season,
        prova: Prova,
        participants: Vec<ParticipatingPenya>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.seasons.lock().expect("repository mutex poisoned");
        let data = guard.entry(season).or_default();
        if data.proves.iter().any(|stored| stored.id == prova.id) {
            return Err(RepositoryError::Conflict);
        }
        data.participants.insert(prova.id.clone(), participants);
        data.proves.push(prova);
        Ok(())
    }

    fn participants(
        &self,
        season: Season,
        id: &ProvaId,
    ) -> Result<Vec<ParticipatingPenya>, RepositoryError> {
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&season)
            .and_then(|data| data.participants.get(id).cloned())
            .unwrap_or_default())
    }

    fn update_participant(
        &self,
        season: Season,
        id: &ProvaId,
        participant: ParticipatingPenya,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.seasons.lock().expect("repository mutex poisoned");
        let stored = guard
            .get_mut(&season)
            .and_then(|data| data.participants.get_mut(id))
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
        let guard = self.seasons.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(&season)
            .map(|data| data.results.clone())
            .unwrap_or_default())
    }

    fn commit_transition(
        &self,
        season: Season,
        id: &ProvaId,
        transition: ProvaTransition,
    ) -> Result<(), RepositoryError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("commit rejected".to_string()));
        }

        let mut guard = self.seasons.lock().expect("repository mutex poisoned");
        let data = guard.get_mut(&season).ok_or(RepositoryError::NotFound)?;
        let prova = data
            .proves
            .iter_mut()
            .find(|prova| &prova.id == id)
            .ok_or(RepositoryError::NotFound)?;

        lifecycle::apply(prova, &transition);
        match transition {
            ProvaTransition::Finish { results } => {
                data.results.insert(id.clone(), results);
            }
            ProvaTransition::Reopen => {
                data.results.remove(id);
            }
        }
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl CircuitRepository for UnavailableRepository {
    fn seasons(&self) -> Result<Vec<Season>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn penyes(&self, _season: Season) -> Result<Vec<Penya>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_penyes(&self, _season: Season, _penyes: Vec<Penya>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_penya(&self, _season: Season, _penya: Penya) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn proves(&self, _season: Season) -> Result<Vec<Prova>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_prova(
        &self,
        _season: Season,
        _id: &ProvaId,
    ) -> Result<Option<Prova>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_prova(
        &self,
        _season: Season,
        _prova: Prova,
        _participants: Vec<ParticipatingPenya>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn participants(
        &self,
        _season: Season,
        _id: &ProvaId,
    ) -> Result<Vec<ParticipatingPenya>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_participant(
        &self,
        _season: Season,
        _id: &ProvaId,
        _participant: ParticipatingPenya,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn results(
        &self,
        _season: Season,
    ) -> Result<BTreeMap<ProvaId, Vec<ChallengeResult>>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit_transition(
        &self,
        _season: Season,
        _id: &ProvaId,
        _transition: ProvaTransition,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (CircuitService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = CircuitService::new(repository.clone());
    (service, repository)
}

/// Service with teams A, B, C and D on the roster.
pub(super) fn seeded_service() -> (CircuitService<MemoryRepository>, Arc<MemoryRepository>) {
    let (service, repository) = build_service();
    service
        .add_penyes(
            SEASON,
            ["A", "B", "C", "D"].into_iter().map(NewPenya::named).collect(),
        )
        .expect("roster seeded");
    (service, repository)
}

pub(super) fn penya_id(id: &str) -> PenyaId {
    PenyaId(id.to_string())
}

pub(super) fn prova_id(id: &str) -> ProvaId {
    ProvaId(id.to_string())
}

pub(super) fn podium_table() -> PointsTable {
    PointsTable::new(vec![
        PointsRange::bounded(1, 1, 25),
        PointsRange::bounded(2, 2, 18),
        PointsRange::open_ended(3, 10),
    ])
}

pub(super) fn new_prova(
    name: &str,
    challenge_type: ChallengeType,
    win_direction: WinDirection,
    penyes: &[&str],
) -> NewProva {
    NewProva {
        name: name.to_string(),
        description: None,
        image_url: None,
        start_date: NaiveDate::from_ymd_opt(2025, 8, 10).expect("valid date"),
        finish_date: None,
        location: None,
        challenge_type,
        win_direction,
        points_range: podium_table(),
        is_secret: false,
        penyes: penyes
            .iter()
            .map(|id| PenyaSelection {
                penya_id: penya_id(id),
                participates: true,
            })
            .collect(),
    }
}

pub(super) fn circuit_router_with_service(
    service: CircuitService<MemoryRepository>,
) -> axum::Router {
    circuit_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
