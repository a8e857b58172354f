use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::points::PointsTable;

/// A season of the circuit, keyed by calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season(pub i32);

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for teams.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PenyaId(pub String);

impl fmt::Display for PenyaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvaId(pub String);

impl fmt::Display for ProvaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scoring method of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    #[serde(alias = "Participació", alias = "Participacio")]
    Participation,
    #[serde(alias = "Temps")]
    Time,
    #[serde(alias = "Punts")]
    Points,
    #[serde(alias = "Rondes")]
    EliminationRounds,
    #[serde(alias = "MultiProva")]
    MultiEvent,
}

impl ChallengeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Participation => "Participation",
            Self::Time => "Time",
            Self::Points => "Points",
            Self::EliminationRounds => "Elimination Rounds",
            Self::MultiEvent => "Multi-Event",
        }
    }

    /// Whether the ranker knows how to order entries of this type.
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Participation | Self::Time | Self::Points)
    }

    /// Time and points events are meaningless without a win direction.
    pub const fn requires_win_direction(self) -> bool {
        matches!(self, Self::Time | Self::Points)
    }
}

/// Whether lower or higher raw values rank better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinDirection {
    #[default]
    #[serde(alias = "NONE")]
    None,
    /// Lower is better, e.g. a faster time.
    #[serde(rename = "asc", alias = "ASC")]
    Ascending,
    /// Higher is better, e.g. more points.
    #[serde(rename = "desc", alias = "DESC")]
    Descending,
}

impl WinDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ascending => "lower wins",
            Self::Descending => "higher wins",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A competing team. Total points and position are never stored here; they are
/// derived by the standings aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penya {
    pub id: PenyaId,
    pub name: String,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single scored event within a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prova {
    pub id: ProvaId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub win_direction: WinDirection,
    #[serde(default)]
    pub points_range: PointsTable,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default)]
    pub is_secret: bool,
}

impl Prova {
    pub fn status(&self) -> ProvaStatus {
        if self.is_finished {
            ProvaStatus::Finished
        } else {
            ProvaStatus::Open
        }
    }
}

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvaStatus {
    Open,
    Finished,
}

impl ProvaStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finished => "finished",
        }
    }
}

/// A team's entry in one event. `result` is `None` until a measurement is
/// recorded; stored snapshots may also carry `-1` for the same meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipatingPenya {
    pub penya_id: PenyaId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default = "default_participates")]
    pub participates: bool,
    #[serde(default, deserialize_with = "deserialize_measurement")]
    pub result: Option<f64>,
}

impl ParticipatingPenya {
    pub fn new(penya_id: PenyaId, name: impl Into<String>) -> Self {
        Self {
            penya_id,
            name: name.into(),
            index: None,
            participates: true,
            result: None,
        }
    }

    pub fn with_result(mut self, result: f64) -> Self {
        self.result = Some(result);
        self
    }

    pub fn excluded(mut self) -> Self {
        self.participates = false;
        self
    }
}

fn default_participates() -> bool {
    true
}

/// Ranked outcome of one event for one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub penya_id: PenyaId,
    pub name: String,
    pub position: u32,
    pub points_awarded: u32,
    #[serde(default, deserialize_with = "deserialize_measurement")]
    pub result: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMeasurement {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Accepts numbers, booleans (participation flags) and numeric strings.
/// Anything unparseable is treated as "not entered".
pub(crate) fn deserialize_measurement<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawMeasurement>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        RawMeasurement::Number(number) => Some(number),
        RawMeasurement::Flag(true) => Some(1.0),
        RawMeasurement::Flag(false) => Some(0.0),
        RawMeasurement::Text(text) => text.trim().parse::<f64>().ok(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn challenge_type_accepts_stored_spellings() {
        let parsed: Vec<ChallengeType> = serde_json::from_value(json!([
            "Temps",
            "Punts",
            "Participació",
            "Rondes",
            "MultiProva",
            "time"
        ]))
        .expect("challenge types parse");

        assert_eq!(
            parsed,
            vec![
                ChallengeType::Time,
                ChallengeType::Points,
                ChallengeType::Participation,
                ChallengeType::EliminationRounds,
                ChallengeType::MultiEvent,
                ChallengeType::Time,
            ]
        );
    }

    #[test]
    fn win_direction_accepts_upper_case() {
        let parsed: Vec<WinDirection> =
            serde_json::from_value(json!(["ASC", "desc", "NONE"])).expect("directions parse");
        assert_eq!(
            parsed,
            vec![
                WinDirection::Ascending,
                WinDirection::Descending,
                WinDirection::None
            ]
        );
    }

    #[test]
    fn participant_result_accepts_flags_and_strings() {
        let entries: Vec<ParticipatingPenya> = serde_json::from_value(json!([
            { "penya_id": "a", "name": "A", "result": true },
            { "penya_id": "b", "name": "B", "result": "95" },
            { "penya_id": "c", "name": "C", "result": null, "participates": false },
            { "penya_id": "d", "name": "D" }
        ]))
        .expect("participants parse");

        assert_eq!(entries[0].result, Some(1.0));
        assert_eq!(entries[1].result, Some(95.0));
        assert_eq!(entries[2].result, None);
        assert!(!entries[2].participates);
        assert!(entries[3].participates, "participation defaults to true");
        assert_eq!(entries[3].result, None);
    }

    #[test]
    fn unsupported_types_are_flagged() {
        assert!(!ChallengeType::EliminationRounds.is_supported());
        assert!(!ChallengeType::MultiEvent.is_supported());
        assert!(ChallengeType::Participation.is_supported());
        assert!(!ChallengeType::Participation.requires_win_direction());
    }
}
