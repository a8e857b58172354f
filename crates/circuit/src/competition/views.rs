use serde::Serialize;

use super::domain::{
    ChallengeResult, ChallengeType, ParticipatingPenya, Penya, PenyaId, Prova, ProvaId,
    ProvaStatus,
};
use super::standings::{DirectionChange, RankedPenya};

/// Placeholder shown instead of anything a secret team or event hides.
pub const HIDDEN: &str = "???";

/// Standings row as shown on the public leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicStanding {
    pub penya_id: PenyaId,
    pub position: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub direction_change: Option<DirectionChange>,
    pub is_secret: bool,
}

impl RankedPenya {
    /// Secret teams keep their position but hide name, points and image.
    pub fn public_view(&self) -> PublicStanding {
        if self.is_secret {
            PublicStanding {
                penya_id: self.penya_id.clone(),
                position: self.position,
                name: HIDDEN.to_string(),
                total_points: None,
                image_url: None,
                direction_change: self.direction_change,
                is_secret: true,
            }
        } else {
            PublicStanding {
                penya_id: self.penya_id.clone(),
                position: self.position,
                name: self.name.clone(),
                total_points: Some(self.total_points),
                image_url: self.image_url.clone(),
                direction_change: self.direction_change,
                is_secret: false,
            }
        }
    }
}

/// Entries of an open event or frozen results of a finished one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvaBoard {
    Open { entries: Vec<ParticipatingPenya> },
    Finished { results: Vec<ChallengeResult> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvaView {
    pub prova: Prova,
    #[serde(flatten)]
    pub board: ProvaBoard,
}

impl Prova {
    /// Secret events keep their schedule and results but hide what they are.
    pub fn public_view(mut self) -> Self {
        if self.is_secret {
            self.name = HIDDEN.to_string();
            self.description = None;
            self.image_url = None;
        }
        self
    }
}

impl ProvaView {
    pub fn public_view(self) -> Self {
        Self {
            prova: self.prova.public_view(),
            board: self.board,
        }
    }
}

/// How one team fared in one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenyaProvaSummary {
    pub prova_id: ProvaId,
    pub name: String,
    pub challenge_type: ChallengeType,
    pub status: ProvaStatus,
    pub is_secret: bool,
    pub participates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

/// Builds a team's line for one event. `entries` is the live order for open
/// events; `results` is only consulted once the event is finished.
pub fn summarize_penya_prova(
    penya_id: &PenyaId,
    prova: &Prova,
    entries: &[ParticipatingPenya],
    results: Option<&[ChallengeResult]>,
) -> PenyaProvaSummary {
    let entry = entries.iter().find(|entry| &entry.penya_id == penya_id);
    let mut summary = PenyaProvaSummary {
        prova_id: prova.id.clone(),
        name: prova.name.clone(),
        challenge_type: prova.challenge_type,
        status: prova.status(),
        is_secret: prova.is_secret,
        participates: entry.map_or(false, |entry| entry.participates),
        position: None,
        result: entry.and_then(|entry| entry.result),
        points: None,
    };

    match prova.status() {
        ProvaStatus::Open => {
            if summary.participates {
                summary.position = entry.and_then(|entry| entry.index);
            }
        }
        ProvaStatus::Finished => {
            if let Some(frozen) = results
                .unwrap_or_default()
                .iter()
                .find(|result| &result.penya_id == penya_id)
            {
                summary.position = Some(frozen.position);
                summary.points = Some(frozen.points_awarded);
                summary.result = frozen.result;
            }
        }
    }

    summary
}

/// A team's page: roster record, current standing and per-event lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenyaSummary {
    pub penya: Penya,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standing: Option<RankedPenya>,
    pub proves: Vec<PenyaProvaSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicPenyaSummary {
    pub penya_id: PenyaId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standing: Option<PublicStanding>,
    pub proves: Vec<PenyaProvaSummary>,
}

impl PenyaSummary {
    pub fn public_view(self) -> PublicPenyaSummary {
        let secret = self.penya.is_secret;
        let proves = self
            .proves
            .into_iter()
            .map(|mut line| {
                if line.is_secret {
                    line.name = HIDDEN.to_string();
                }
                line
            })
            .collect();

        PublicPenyaSummary {
            penya_id: self.penya.id,
            name: if secret {
                HIDDEN.to_string()
            } else {
                self.penya.name
            },
            description: self.penya.description.filter(|_| !secret),
            image_url: self.penya.image_url.filter(|_| !secret),
            standing: self.standing.as_ref().map(RankedPenya::public_view),
            proves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::domain::WinDirection;
    use crate::competition::points::PointsTable;
    use chrono::NaiveDate;

    fn prova(is_finished: bool) -> Prova {
        Prova {
            id: ProvaId("cursa".to_string()),
            name: "Cursa".to_string(),
            description: Some("10k".to_string()),
            image_url: None,
            start_date: NaiveDate::from_ymd_opt(2025, 8, 10).expect("valid date"),
            finish_date: None,
            location: None,
            challenge_type: ChallengeType::Time,
            win_direction: WinDirection::Ascending,
            points_range: PointsTable::standard(),
            is_finished,
            is_secret: false,
        }
    }

    fn ranked(is_secret: bool) -> RankedPenya {
        RankedPenya {
            penya_id: PenyaId("a".to_string()),
            name: "A".to_string(),
            total_points: 40,
            position: 2,
            is_secret,
            image_url: Some("https://img/a.png".to_string()),
            direction_change: Some(DirectionChange::Up),
        }
    }

    #[test]
    fn secret_standing_hides_identity_but_keeps_position() {
        let view = ranked(true).public_view();
        assert_eq!(view.name, HIDDEN);
        assert_eq!(view.total_points, None);
        assert_eq!(view.image_url, None);
        assert_eq!(view.position, 2);
        assert_eq!(view.direction_change, Some(DirectionChange::Up));

        let open = ranked(false).public_view();
        assert_eq!(open.total_points, Some(40));
    }

    #[test]
    fn open_event_summary_uses_live_index() {
        let mut entry = ParticipatingPenya::new(PenyaId("a".to_string()), "A").with_result(90.0);
        entry.index = Some(3);
        let summary = summarize_penya_prova(&PenyaId("a".to_string()), &prova(false), &[entry], None);

        assert!(summary.participates);
        assert_eq!(summary.position, Some(3));
        assert_eq!(summary.result, Some(90.0));
        assert_eq!(summary.points, None);
    }

    #[test]
    fn finished_event_summary_uses_frozen_results() {
        let entry = ParticipatingPenya::new(PenyaId("a".to_string()), "A").with_result(90.0);
        let frozen = vec![ChallengeResult {
            penya_id: PenyaId("a".to_string()),
            name: "A".to_string(),
            position: 1,
            points_awarded: 25,
            result: Some(90.0),
        }];
        let summary = summarize_penya_prova(
            &PenyaId("a".to_string()),
            &prova(true),
            &[entry],
            Some(&frozen),
        );

        assert_eq!(summary.position, Some(1));
        assert_eq!(summary.points, Some(25));
    }

    #[test]
    fn absent_team_does_not_participate() {
        let summary = summarize_penya_prova(&PenyaId("z".to_string()), &prova(false), &[], None);
        assert!(!summary.participates);
        assert_eq!(summary.position, None);
    }

    #[test]
    fn open_board_serializes_with_status_tag() {
        let view = ProvaView {
            prova: prova(false),
            board: ProvaBoard::Open {
                entries: Vec::new(),
            },
        };
        let value = serde_json::to_value(&view).expect("serializes");
        assert_eq!(value["status"], "open");
        assert!(value["entries"].is_array());
    }

    #[test]
    fn secret_event_is_masked_publicly() {
        let mut secret = prova(false);
        secret.is_secret = true;
        let view = ProvaView {
            prova: secret,
            board: ProvaBoard::Open {
                entries: Vec::new(),
            },
        }
        .public_view();
        assert_eq!(view.prova.name, HIDDEN);
        assert_eq!(view.prova.description, None);
    }
}
