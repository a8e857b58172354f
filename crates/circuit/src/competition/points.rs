use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rule mapping the finishing ranks `from..=to` to awarded points. A missing
/// `to` makes the range open-ended ("and above").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRange {
    pub from: u32,
    #[serde(default)]
    pub to: Option<u32>,
    pub points: u32,
}

impl PointsRange {
    pub const fn bounded(from: u32, to: u32, points: u32) -> Self {
        Self {
            from,
            to: Some(to),
            points,
        }
    }

    pub const fn open_ended(from: u32, points: u32) -> Self {
        Self {
            from,
            to: None,
            points,
        }
    }

    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.from && self.to.map_or(true, |to| rank <= to)
    }
}

/// Returns the points of the first range containing `rank`, or zero when no
/// range matches. Rank zero never scores.
pub fn points_for_rank(ranges: &[PointsRange], rank: u32) -> u32 {
    if rank == 0 {
        return 0;
    }

    ranges
        .iter()
        .find(|range| range.contains(rank))
        .map_or(0, |range| range.points)
}

/// Position-to-points configuration of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsTable(Vec<PointsRange>);

impl PointsTable {
    /// Wraps ranges without validating them; lookups stay total either way.
    pub fn new(ranges: Vec<PointsRange>) -> Self {
        Self(ranges)
    }

    pub fn validated(ranges: Vec<PointsRange>) -> Result<Self, PointsTableError> {
        let table = Self(ranges);
        table.validate()?;
        Ok(table)
    }

    /// Default table offered to event creators.
    pub fn standard() -> Self {
        Self(vec![
            PointsRange::bounded(1, 1, 25),
            PointsRange::bounded(2, 3, 18),
            PointsRange::bounded(4, 10, 10),
            PointsRange::bounded(11, 20, 5),
            PointsRange::open_ended(21, 3),
        ])
    }

    pub fn ranges(&self) -> &[PointsRange] {
        &self.0
    }

    pub fn points_for_rank(&self, rank: u32) -> u32 {
        points_for_rank(&self.0, rank)
    }

    /// Checks the authoring rules: ranks start at 1, `from` values are
    /// pairwise distinct, `from <= to`, and only the range with the largest
    /// `from` may be open-ended. Gaps are allowed and score zero.
    pub fn validate(&self) -> Result<(), PointsTableError> {
        let mut seen = HashSet::new();
        for range in &self.0 {
            if range.from == 0 {
                return Err(PointsTableError::ZeroRank);
            }
            if !seen.insert(range.from) {
                return Err(PointsTableError::DuplicateStart { from: range.from });
            }
            if let Some(to) = range.to {
                if to < range.from {
                    return Err(PointsTableError::Inverted {
                        from: range.from,
                        to,
                    });
                }
            }
        }

        let highest_start = self.0.iter().map(|range| range.from).max();
        if let Some(open) = self
            .0
            .iter()
            .find(|range| range.to.is_none() && Some(range.from) != highest_start)
        {
            return Err(PointsTableError::OpenRangeNotLast { from: open.from });
        }

        Ok(())
    }
}

/// Configuration errors surfaced to the event creator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointsTableError {
    #[error("ranks start at 1; a range cannot begin at 0")]
    ZeroRank,
    #[error("more than one range starts at position {from}")]
    DuplicateStart { from: u32 },
    #[error("range starting at {from} ends before it begins ({to})")]
    Inverted { from: u32, to: u32 },
    #[error("only the last range may be open-ended (range starting at {from} is not last)")]
    OpenRangeNotLast { from: u32 },
}
