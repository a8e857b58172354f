use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::info;

use super::domain::{ChallengeResult, ChallengeType, ParticipatingPenya, PenyaId, WinDirection};
use super::normalizer::{normalize, NormalizedEntry};
use super::points::PointsTable;

/// Raised when an entry list cannot be ranked as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("team {0} appears more than once in the entry list")]
    DuplicatePenya(PenyaId),
}

/// Ranks one event's entries and awards points.
///
/// Valid entries come first, ordered by measurement in the win direction;
/// ties keep their input order. Non-participants and entries without a
/// measurement follow, ordered by name, and always score zero. Elimination
/// rounds and multi-event challenges are not rankable yet and yield an empty
/// list.
///
/// Participation entries count as valid only when their measurement is
/// exactly `1` (`true`); `0`/`false` is treated as not entered.
pub fn rank(
    entries: &[ParticipatingPenya],
    challenge_type: ChallengeType,
    win_direction: WinDirection,
    table: &PointsTable,
) -> Result<Vec<ChallengeResult>, RankingError> {
    ensure_unique_penyes(entries)?;

    let Some(ordered) = order(entries, challenge_type, win_direction) else {
        return Ok(Vec::new());
    };

    let results = ordered
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            let position = index as u32 + 1;
            let points_awarded = if slot.valid {
                table.points_for_rank(position)
            } else {
                0
            };
            ChallengeResult {
                penya_id: slot.entry.penya_id,
                name: slot.entry.name,
                position,
                points_awarded,
                result: slot.raw_result,
            }
        })
        .collect();

    Ok(results)
}

/// Provisional order of an open event: participating entries only, in the
/// order `rank` would produce, with a 1-based `index`. No points are awarded.
pub fn live_order(
    entries: &[ParticipatingPenya],
    challenge_type: ChallengeType,
    win_direction: WinDirection,
) -> Result<Vec<ParticipatingPenya>, RankingError> {
    ensure_unique_penyes(entries)?;

    let participating: Vec<ParticipatingPenya> = entries
        .iter()
        .filter(|entry| entry.participates)
        .cloned()
        .collect();

    let Some(ordered) = order(&participating, challenge_type, win_direction) else {
        return Ok(participating
            .into_iter()
            .map(|entry| ParticipatingPenya {
                index: None,
                ..entry
            })
            .collect());
    };

    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(index, slot)| ParticipatingPenya {
            index: Some(index as u32 + 1),
            ..participating[slot.source].clone()
        })
        .collect())
}

/// Participating entries that would not be ranked if the event closed now.
pub fn unranked_participants(
    entries: &[ParticipatingPenya],
    challenge_type: ChallengeType,
) -> Vec<&ParticipatingPenya> {
    if !challenge_type.is_supported() {
        return Vec::new();
    }

    entries
        .iter()
        .filter(|entry| entry.participates)
        .filter(|entry| !is_rankable(challenge_type, &normalize(entry)))
        .collect()
}

pub fn ensure_unique_penyes(entries: &[ParticipatingPenya]) -> Result<(), RankingError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(&entry.penya_id) {
            return Err(RankingError::DuplicatePenya(entry.penya_id.clone()));
        }
    }
    Ok(())
}

struct Slot {
    source: usize,
    entry: NormalizedEntry,
    raw_result: Option<f64>,
    valid: bool,
}

fn order(
    entries: &[ParticipatingPenya],
    challenge_type: ChallengeType,
    win_direction: WinDirection,
) -> Option<Vec<Slot>> {
    if !challenge_type.is_supported() {
        info!(
            challenge_type = challenge_type.label(),
            entries = entries.len(),
            "challenge type has no ranking yet; returning no results"
        );
        return None;
    }

    let (mut valid, mut invalid): (Vec<Slot>, Vec<Slot>) = entries
        .iter()
        .enumerate()
        .map(|(source, entry)| {
            let normalized = normalize(entry);
            let valid = is_rankable(challenge_type, &normalized);
            Slot {
                source,
                entry: normalized,
                raw_result: entry.result,
                valid,
            }
        })
        .partition(|slot| slot.valid);

    if challenge_type != ChallengeType::Participation {
        match win_direction {
            WinDirection::Ascending => valid.sort_by(|a, b| compare_values(a, b)),
            WinDirection::Descending => valid.sort_by(|a, b| compare_values(b, a)),
            WinDirection::None => {}
        }
    }

    // Ordinal, not locale-aware.
    invalid.sort_by(|a, b| a.entry.name.cmp(&b.entry.name));

    valid.extend(invalid);
    Some(valid)
}

fn compare_values(a: &Slot, b: &Slot) -> Ordering {
    match (a.entry.comparable_value, b.entry.comparable_value) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        _ => Ordering::Equal,
    }
}

// Participation events only rank teams marked as present (normalized to 1).
fn is_rankable(challenge_type: ChallengeType, entry: &NormalizedEntry) -> bool {
    match challenge_type {
        ChallengeType::Participation => entry.comparable_value == Some(1.0),
        ChallengeType::Time | ChallengeType::Points => entry.comparable_value.is_some(),
        ChallengeType::EliminationRounds | ChallengeType::MultiEvent => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::points::PointsRange;

    fn team(id: &str) -> ParticipatingPenya {
        ParticipatingPenya::new(PenyaId(id.to_lowercase()), id)
    }

    fn podium() -> PointsTable {
        PointsTable::new(vec![
            PointsRange::bounded(1, 1, 25),
            PointsRange::bounded(2, 2, 18),
            PointsRange::open_ended(3, 10),
        ])
    }

    fn summary(results: &[ChallengeResult]) -> Vec<(&str, u32, u32)> {
        results
            .iter()
            .map(|result| (result.name.as_str(), result.position, result.points_awarded))
            .collect()
    }

    #[test]
    fn ascending_time_event_places_fastest_first() {
        let entries = vec![
            team("A").with_result(120.0),
            team("B").with_result(95.0),
            team("C"),
            team("D").with_result(80.0).excluded(),
        ];

        let results = rank(
            &entries,
            ChallengeType::Time,
            WinDirection::Ascending,
            &podium(),
        )
        .expect("ranks");

        assert_eq!(
            summary(&results),
            vec![("B", 1, 25), ("A", 2, 18), ("C", 3, 0), ("D", 4, 0)]
        );
        assert_eq!(results[3].result, Some(80.0), "raw result is kept");
    }

    #[test]
    fn descending_points_event_rewards_higher_scores() {
        let entries = vec![
            team("A").with_result(12.0),
            team("B").with_result(30.0),
            team("C").with_result(18.0),
        ];

        let results = rank(
            &entries,
            ChallengeType::Points,
            WinDirection::Descending,
            &podium(),
        )
        .expect("ranks");

        assert_eq!(
            summary(&results),
            vec![("B", 1, 25), ("C", 2, 18), ("A", 3, 10)]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let entries = vec![
            team("Zeta").with_result(50.0),
            team("Alpha").with_result(50.0),
            team("Mid").with_result(60.0),
        ];

        let results = rank(
            &entries,
            ChallengeType::Points,
            WinDirection::Descending,
            &podium(),
        )
        .expect("ranks");

        assert_eq!(
            summary(&results),
            vec![("Mid", 1, 25), ("Zeta", 2, 18), ("Alpha", 3, 10)]
        );
    }

    #[test]
    fn participation_ranks_present_teams_in_entry_order() {
        let entries = vec![
            team("Late").with_result(1.0),
            team("Absent").with_result(0.0),
            team("Early").with_result(1.0),
            team("Unknown"),
        ];

        let results = rank(
            &entries,
            ChallengeType::Participation,
            WinDirection::None,
            &podium(),
        )
        .expect("ranks");

        assert_eq!(
            summary(&results),
            vec![
                ("Late", 1, 25),
                ("Early", 2, 18),
                ("Absent", 3, 0),
                ("Unknown", 4, 0)
            ]
        );
    }

    #[test]
    fn direction_is_ignored_for_participation() {
        let entries = vec![team("B").with_result(1.0), team("A").with_result(1.0)];
        let none = rank(
            &entries,
            ChallengeType::Participation,
            WinDirection::None,
            &podium(),
        )
        .expect("ranks");
        let desc = rank(
            &entries,
            ChallengeType::Participation,
            WinDirection::Descending,
            &podium(),
        )
        .expect("ranks");
        assert_eq!(none, desc);
    }

    #[test]
    fn all_invalid_entries_are_listed_by_name_with_zero_points() {
        let entries = vec![team("Carrot"), team("apple"), team("Banana").excluded()];

        let results = rank(
            &entries,
            ChallengeType::Time,
            WinDirection::Ascending,
            &podium(),
        )
        .expect("ranks");

        // Ordinal compare: upper case sorts before lower case.
        assert_eq!(
            summary(&results),
            vec![("Banana", 1, 0), ("Carrot", 2, 0), ("apple", 3, 0)]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let results = rank(&[], ChallengeType::Time, WinDirection::Ascending, &podium())
            .expect("ranks");
        assert!(results.is_empty());
    }

    #[test]
    fn unsupported_types_return_no_results() {
        let entries = vec![team("A").with_result(1.0)];
        for challenge_type in [ChallengeType::EliminationRounds, ChallengeType::MultiEvent] {
            let results = rank(&entries, challenge_type, WinDirection::Descending, &podium())
                .expect("unsupported types are not errors");
            assert!(results.is_empty());
        }
    }

    #[test]
    fn duplicate_teams_are_rejected() {
        let entries = vec![team("A").with_result(1.0), team("A").with_result(2.0)];
        let err = rank(&entries, ChallengeType::Time, WinDirection::Ascending, &podium())
            .expect_err("duplicates rejected");
        assert_eq!(err, RankingError::DuplicatePenya(PenyaId("a".to_string())));
    }

    #[test]
    fn ranking_is_deterministic() {
        let entries = vec![
            team("A").with_result(10.0),
            team("B").with_result(10.0),
            team("C"),
            team("D").with_result(3.0),
        ];
        let first = rank(&entries, ChallengeType::Time, WinDirection::Ascending, &podium())
            .expect("ranks");
        let second = rank(&entries, ChallengeType::Time, WinDirection::Ascending, &podium())
            .expect("ranks");
        assert_eq!(
            serde_json::to_string(&first).expect("serializes"),
            serde_json::to_string(&second).expect("serializes")
        );
    }

    #[test]
    fn live_order_omits_non_participants() {
        let entries = vec![
            team("A").with_result(120.0),
            team("B"),
            team("C").with_result(90.0),
            team("D").excluded(),
        ];

        let live = live_order(&entries, ChallengeType::Time, WinDirection::Ascending)
            .expect("orders");

        let order: Vec<(&str, Option<u32>)> = live
            .iter()
            .map(|entry| (entry.name.as_str(), entry.index))
            .collect();
        assert_eq!(order, vec![("C", Some(1)), ("A", Some(2)), ("B", Some(3))]);
    }

    #[test]
    fn unranked_participants_lists_missing_measurements() {
        let entries = vec![
            team("A").with_result(120.0),
            team("B"),
            team("C").with_result(-1.0),
            team("D").excluded(),
        ];

        let missing: Vec<&str> = unranked_participants(&entries, ChallengeType::Time)
            .into_iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(missing, vec!["B", "C"]);
    }
}
