use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{
    deserialize_measurement, ChallengeResult, ChallengeType, Location, ParticipatingPenya, Penya,
    PenyaId, Prova, ProvaId, ProvaStatus, Season, WinDirection,
};
use super::lifecycle::{self, LifecycleError, ProvaTransition};
use super::points::{PointsTable, PointsTableError};
use super::ranker::{self, RankingError};
use super::repository::{CircuitRepository, RepositoryError};
use super::roster::{self, slugify, NewPenya, RosterImportError};
use super::standings::{aggregate, RankedPenya, StandingsSnapshot, StandingsTracker};
use super::views::{summarize_penya_prova, PenyaSummary, ProvaBoard, ProvaView};

/// Admin and public operations over one repository.
///
/// Standings deltas are tracked per season; each season's tracker sits behind
/// its own lock so recomputations for one season are applied one at a time.
/// Roster edits and event closes/reopens recompute the standings; reads
/// return the stored ranking.
pub struct CircuitService<R> {
    repository: Arc<R>,
    trackers: Mutex<HashMap<Season, Arc<Mutex<StandingsTracker>>>>,
}

/// Event as authored by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProva {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub finish_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<Location>,
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub win_direction: WinDirection,
    #[serde(default = "PointsTable::standard")]
    pub points_range: PointsTable,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub penyes: Vec<PenyaSelection>,
}

/// Whether a roster team takes part in a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct PenyaSelection {
    pub penya_id: PenyaId,
    #[serde(default = "selected")]
    pub participates: bool,
}

fn selected() -> bool {
    true
}

/// Admin edit of a team. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PenyaUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_secret: Option<bool>,
}

/// New measurement for one entry. A missing `result` clears the measurement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultUpdate {
    #[serde(default, deserialize_with = "deserialize_measurement")]
    pub result: Option<f64>,
    #[serde(default)]
    pub participates: Option<bool>,
}

/// Outcome of closing an event.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CloseOutcome {
    pub prova_id: ProvaId,
    pub results: Vec<ChallengeResult>,
    /// Teams that were closed without a result (only non-empty when forced).
    pub missing: Vec<String>,
}

impl<R> CircuitService<R>
where
    R: CircuitRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    pub fn seasons(&self) -> Result<Vec<Season>, CircuitServiceError> {
        let mut seasons = self.repository.seasons()?;
        seasons.sort();
        seasons.dedup();
        Ok(seasons)
    }

    pub fn penyes(&self, season: Season) -> Result<Vec<Penya>, CircuitServiceError> {
        Ok(self.repository.penyes(season)?)
    }

    /// Bulk roster import. Returns one flag per input: `true` when the team
    /// was added, `false` when its name was blank or already taken. Names
    /// that leave no slug (e.g. written only in non-Latin scripts) get an
    /// index-based id such as `penya-1`.
    pub fn add_penyes(
        &self,
        season: Season,
        penyes: Vec<NewPenya>,
    ) -> Result<Vec<bool>, CircuitServiceError> {
        let existing = self.repository.penyes(season)?;
        let mut taken_names: HashSet<String> =
            existing.iter().map(|penya| penya.name.trim().to_string()).collect();
        let mut taken_ids: HashSet<PenyaId> = existing.into_iter().map(|penya| penya.id).collect();

        let mut added = Vec::new();
        let flags: Vec<bool> = penyes
            .into_iter()
            .map(|new_penya| {
                let mut penya = new_penya.into_penya();
                if penya.name.is_empty() || taken_names.contains(&penya.name) {
                    return false;
                }
                if penya.id.0.is_empty() {
                    penya.id = PenyaId(roster::fallback_id("penya", |candidate| {
                        taken_ids.contains(&PenyaId(candidate.to_string()))
                    }));
                }
                if taken_ids.contains(&penya.id) {
                    return false;
                }
                taken_names.insert(penya.name.clone());
                taken_ids.insert(penya.id.clone());
                added.push(penya);
                true
            })
            .collect();

        if !added.is_empty() {
            let count = added.len();
            self.repository.insert_penyes(season, added)?;
            info!(%season, added = count, "teams added to roster");
            self.refresh_standings(season);
        }

        Ok(flags)
    }

    pub fn import_roster<Rd: Read>(
        &self,
        season: Season,
        reader: Rd,
    ) -> Result<Vec<bool>, CircuitServiceError> {
        let penyes = roster::parse_roster(reader)?;
        self.add_penyes(season, penyes)
    }

    pub fn update_penya(
        &self,
        season: Season,
        penya_id: &PenyaId,
        update: PenyaUpdate,
    ) -> Result<Penya, CircuitServiceError> {
        let mut penya = self
            .repository
            .penyes(season)?
            .into_iter()
            .find(|penya| &penya.id == penya_id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::BlankName.into());
            }
            penya.name = name;
        }
        if let Some(description) = update.description {
            penya.description = Some(description).filter(|value| !value.trim().is_empty());
        }
        if let Some(image_url) = update.image_url {
            penya.image_url = Some(image_url).filter(|value| !value.trim().is_empty());
        }
        if let Some(is_secret) = update.is_secret {
            penya.is_secret = is_secret;
        }

        self.repository.update_penya(season, penya.clone())?;
        self.refresh_standings(season);
        Ok(penya)
    }

    /// Events of a season, most recent first.
    pub fn proves(&self, season: Season) -> Result<Vec<Prova>, CircuitServiceError> {
        let mut proves = self.repository.proves(season)?;
        proves.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(proves)
    }

    /// Validates and stores a new open event with one entry per selected team.
    pub fn create_prova(
        &self,
        season: Season,
        new_prova: NewProva,
    ) -> Result<Prova, CircuitServiceError> {
        let name = new_prova.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::BlankName.into());
        }
        let mut id = ProvaId(slugify(&name));
        if id.0.is_empty() {
            let taken: HashSet<String> = self
                .repository
                .proves(season)?
                .into_iter()
                .map(|prova| prova.id.0)
                .collect();
            id = ProvaId(roster::fallback_id("prova", |candidate| {
                taken.contains(candidate)
            }));
        }

        new_prova.points_range.validate().map_err(ValidationError::from)?;

        let win_direction = match new_prova.challenge_type {
            ChallengeType::Participation => WinDirection::None,
            challenge_type
                if challenge_type.requires_win_direction()
                    && new_prova.win_direction == WinDirection::None =>
            {
                return Err(ValidationError::MissingWinDirection(challenge_type).into());
            }
            _ => new_prova.win_direction,
        };

        let roster: HashMap<PenyaId, Penya> = self
            .repository
            .penyes(season)?
            .into_iter()
            .map(|penya| (penya.id.clone(), penya))
            .collect();

        let mut participants = Vec::new();
        let mut seen = HashSet::new();
        for selection in &new_prova.penyes {
            if !seen.insert(selection.penya_id.clone()) {
                return Err(ValidationError::DuplicatePenya(selection.penya_id.clone()).into());
            }
            let penya = roster
                .get(&selection.penya_id)
                .ok_or_else(|| ValidationError::UnknownPenya(selection.penya_id.clone()))?;
            if selection.participates {
                participants.push(ParticipatingPenya::new(penya.id.clone(), penya.name.clone()));
            }
        }

        let prova = Prova {
            id,
            name,
            description: new_prova.description,
            image_url: new_prova.image_url,
            start_date: new_prova.start_date,
            finish_date: new_prova.finish_date,
            location: new_prova.location,
            challenge_type: new_prova.challenge_type,
            win_direction,
            points_range: new_prova.points_range,
            is_finished: false,
            is_secret: new_prova.is_secret,
        };

        let entries = participants.len();
        self.repository.insert_prova(season, prova.clone(), participants)?;
        info!(%season, prova = %prova.id, entries, "event created");
        Ok(prova)
    }

    /// Records a measurement or participation change while the event is open.
    pub fn record_result(
        &self,
        season: Season,
        prova_id: &ProvaId,
        penya_id: &PenyaId,
        update: ResultUpdate,
    ) -> Result<ParticipatingPenya, CircuitServiceError> {
        let prova = self.prova(season, prova_id)?;
        lifecycle::ensure_open(&prova)?;

        let mut participant = self
            .repository
            .participants(season, prova_id)?
            .into_iter()
            .find(|entry| &entry.penya_id == penya_id)
            .ok_or(RepositoryError::NotFound)?;

        participant.result = update.result;
        if let Some(participates) = update.participates {
            participant.participates = participates;
        }

        self.repository
            .update_participant(season, prova_id, participant.clone())?;
        Ok(participant)
    }

    /// `Open -> Finished`: ranks the current entries and freezes the results.
    pub fn close_prova(
        &self,
        season: Season,
        prova_id: &ProvaId,
        force: bool,
    ) -> Result<CloseOutcome, CircuitServiceError> {
        let prova = self.prova(season, prova_id)?;
        let entries = self.repository.participants(season, prova_id)?;

        let missing = lifecycle::missing_results(&prova, &entries);
        let transition = lifecycle::close(&prova, &entries, force)?;
        let results = match &transition {
            ProvaTransition::Finish { results } => results.clone(),
            ProvaTransition::Reopen => Vec::new(),
        };

        self.repository
            .commit_transition(season, prova_id, transition)?;
        info!(%season, prova = %prova_id, forced = !missing.is_empty(), "event finished");
        self.refresh_standings(season);

        Ok(CloseOutcome {
            prova_id: prova_id.clone(),
            results,
            missing,
        })
    }

    /// `Finished -> Open`: discards the frozen results.
    pub fn reopen_prova(
        &self,
        season: Season,
        prova_id: &ProvaId,
    ) -> Result<(), CircuitServiceError> {
        let prova = self.prova(season, prova_id)?;
        let transition = lifecycle::reopen(&prova)?;
        self.repository
            .commit_transition(season, prova_id, transition)?;
        info!(%season, prova = %prova_id, "event reopened");
        self.refresh_standings(season);
        Ok(())
    }

    /// Roster plus the frozen results of finished events only.
    pub fn snapshot(&self, season: Season) -> Result<StandingsSnapshot, CircuitServiceError> {
        let penyes = self.repository.penyes(season)?;
        let finished: HashSet<ProvaId> = self
            .repository
            .proves(season)?
            .into_iter()
            .filter(|prova| prova.status() == ProvaStatus::Finished)
            .map(|prova| prova.id)
            .collect();

        let mut results = self.repository.results(season)?;
        results.retain(|prova_id, _| finished.contains(prova_id));

        Ok(StandingsSnapshot { penyes, results })
    }

    /// Entry point for snapshot deliveries: recomputes the season standings
    /// from scratch, reports movement against the previous delivery and
    /// stores the result for `standings`.
    pub fn apply_snapshot(
        &self,
        season: Season,
        snapshot: &StandingsSnapshot,
    ) -> Result<Vec<RankedPenya>, CircuitServiceError> {
        let tracker = self.tracker(season)?;
        let mut tracker = tracker
            .lock()
            .map_err(|_| CircuitServiceError::TrackerPoisoned(season))?;
        Ok(tracker.apply(snapshot))
    }

    /// Standings as of the last roster or result change. Reading never moves
    /// the direction baseline; only the first read of a season that has not
    /// changed yet computes and stores a ranking.
    pub fn standings(&self, season: Season) -> Result<Vec<RankedPenya>, CircuitServiceError> {
        let tracker = self.tracker(season)?;
        let mut tracker = tracker
            .lock()
            .map_err(|_| CircuitServiceError::TrackerPoisoned(season))?;
        if let Some(latest) = tracker.latest() {
            return Ok(latest.to_vec());
        }
        let snapshot = self.snapshot(season)?;
        Ok(tracker.apply(&snapshot))
    }

    /// Live order for open events, frozen results for finished ones.
    pub fn prova_view(
        &self,
        season: Season,
        prova_id: &ProvaId,
    ) -> Result<ProvaView, CircuitServiceError> {
        let prova = self.prova(season, prova_id)?;
        let board = match prova.status() {
            ProvaStatus::Open => {
                let entries = self.repository.participants(season, prova_id)?;
                ProvaBoard::Open {
                    entries: ranker::live_order(&entries, prova.challenge_type, prova.win_direction)?,
                }
            }
            ProvaStatus::Finished => ProvaBoard::Finished {
                results: self
                    .repository
                    .results(season)?
                    .remove(prova_id)
                    .unwrap_or_default(),
            },
        };

        Ok(ProvaView { prova, board })
    }

    /// Team page data. Uses a detached aggregation so reading a team page
    /// never moves the leaderboard's direction baseline.
    pub fn penya_summary(
        &self,
        season: Season,
        penya_id: &PenyaId,
    ) -> Result<PenyaSummary, CircuitServiceError> {
        let snapshot = self.snapshot(season)?;
        let penya = snapshot
            .penyes
            .iter()
            .find(|penya| &penya.id == penya_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;

        let standing = aggregate(&snapshot.penyes, &snapshot.results)
            .into_iter()
            .find(|row| &row.penya_id == penya_id);

        let mut proves = Vec::new();
        for prova in self.proves(season)? {
            let entries = self.repository.participants(season, &prova.id)?;
            let entries = match prova.status() {
                ProvaStatus::Open => {
                    ranker::live_order(&entries, prova.challenge_type, prova.win_direction)?
                }
                ProvaStatus::Finished => entries,
            };
            let frozen = snapshot.results.get(&prova.id).map(Vec::as_slice);
            proves.push(summarize_penya_prova(penya_id, &prova, &entries, frozen));
        }

        Ok(PenyaSummary {
            penya,
            standing,
            proves,
        })
    }

    /// Recomputes the stored standings after a committed change. On failure
    /// the stored ranking is dropped and the next read recomputes it.
    fn refresh_standings(&self, season: Season) {
        if let Err(error) = self.recompute_standings(season) {
            warn!(%season, %error, "standings refresh failed");
        }
    }

    fn recompute_standings(&self, season: Season) -> Result<(), CircuitServiceError> {
        let tracker = self.tracker(season)?;
        let mut tracker = tracker
            .lock()
            .map_err(|_| CircuitServiceError::TrackerPoisoned(season))?;
        match self.snapshot(season) {
            Ok(snapshot) => {
                tracker.apply(&snapshot);
                Ok(())
            }
            Err(error) => {
                tracker.invalidate();
                Err(error)
            }
        }
    }

    fn prova(&self, season: Season, prova_id: &ProvaId) -> Result<Prova, CircuitServiceError> {
        Ok(self
            .repository
            .fetch_prova(season, prova_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn tracker(&self, season: Season) -> Result<Arc<Mutex<StandingsTracker>>, CircuitServiceError> {
        let mut trackers = self
            .trackers
            .lock()
            .map_err(|_| CircuitServiceError::TrackerPoisoned(season))?;
        Ok(trackers.entry(season).or_default().clone())
    }
}

/// Admin input rejected before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be blank")]
    BlankName,
    #[error("{} events need a win direction", .0.label())]
    MissingWinDirection(ChallengeType),
    #[error("team {0} is not on the season roster")]
    UnknownPenya(PenyaId),
    #[error("team {0} is selected more than once")]
    DuplicatePenya(PenyaId),
    #[error("invalid points table: {0}")]
    PointsTable(#[from] PointsTableError),
}

/// Error raised by the circuit service.
#[derive(Debug, thiserror::Error)]
pub enum CircuitServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Roster(#[from] RosterImportError),
    #[error("standings for season {0} are unavailable after a failed update")]
    TrackerPoisoned(Season),
}
