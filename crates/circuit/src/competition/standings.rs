use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ChallengeResult, Penya, PenyaId, ProvaId};

/// Movement of a team relative to the previous standings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionChange {
    Up,
    Down,
    Same,
}

/// One row of the season standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPenya {
    pub penya_id: PenyaId,
    pub name: String,
    pub total_points: u32,
    pub position: u32,
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub direction_change: Option<DirectionChange>,
}

/// Everything the aggregator needs for one season: the roster and the frozen
/// results of every finished event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsSnapshot {
    pub penyes: Vec<Penya>,
    #[serde(default)]
    pub results: BTreeMap<ProvaId, Vec<ChallengeResult>>,
}

/// Sums awarded points per team and sorts by total, highest first. Equal
/// totals keep roster order. Results for teams missing from the roster are
/// ignored. Direction changes are left unset.
pub fn aggregate(
    penyes: &[Penya],
    finished: &BTreeMap<ProvaId, Vec<ChallengeResult>>,
) -> Vec<RankedPenya> {
    let mut totals: HashMap<&PenyaId, u32> = HashMap::new();
    for result in finished.values().flatten() {
        let total = totals.entry(&result.penya_id).or_default();
        *total = total.saturating_add(result.points_awarded);
    }

    let mut ranked: Vec<RankedPenya> = penyes
        .iter()
        .map(|penya| RankedPenya {
            penya_id: penya.id.clone(),
            name: penya.name.clone(),
            total_points: totals.get(&penya.id).copied().unwrap_or(0),
            position: 0,
            is_secret: penya.is_secret,
            image_url: penya.image_url.clone(),
            direction_change: None,
        })
        .collect();

    ranked.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    for (index, row) in ranked.iter_mut().enumerate() {
        row.position = index as u32 + 1;
    }

    ranked
}

/// Aggregator that remembers the previous ranking to report movement.
///
/// Not reentrant: callers serialize `apply` per season, otherwise the
/// baseline races and the reported directions become arbitrary.
#[derive(Debug, Default)]
pub struct StandingsTracker {
    previous: HashMap<PenyaId, u32>,
    latest: Option<Vec<RankedPenya>>,
}

impl StandingsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the standings from scratch and moves the baseline forward.
    pub fn apply(&mut self, snapshot: &StandingsSnapshot) -> Vec<RankedPenya> {
        let mut ranked = aggregate(&snapshot.penyes, &snapshot.results);

        for row in &mut ranked {
            row.direction_change = self
                .previous
                .get(&row.penya_id)
                .map(|&previous| direction(previous, row.position));
        }

        self.previous = ranked
            .iter()
            .map(|row| (row.penya_id.clone(), row.position))
            .collect();

        debug!(
            teams = ranked.len(),
            events = snapshot.results.len(),
            "standings recomputed"
        );

        self.latest = Some(ranked.clone());
        ranked
    }

    /// Ranking produced by the last `apply`, directions included. Reading it
    /// leaves the baseline where it is.
    pub fn latest(&self) -> Option<&[RankedPenya]> {
        self.latest.as_deref()
    }

    /// Drops the stored ranking but keeps the baseline, so the next `apply`
    /// still reports movement against the last delivered positions.
    pub fn invalidate(&mut self) {
        self.latest = None;
    }

    pub fn previous_position(&self, penya_id: &PenyaId) -> Option<u32> {
        self.previous.get(penya_id).copied()
    }
}

fn direction(previous: u32, current: u32) -> DirectionChange {
    if previous > current {
        DirectionChange::Up
    } else if previous < current {
        DirectionChange::Down
    } else {
        DirectionChange::Same
    }
}
