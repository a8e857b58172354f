//! Season competition engine: event ranking, points, standings and the
//! open/finished lifecycle of each event, plus the admin and public surface
//! built on top of them.

pub mod domain;
pub mod lifecycle;
pub mod normalizer;
pub mod points;
pub mod ranker;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod standings;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    ChallengeResult, ChallengeType, Location, ParticipatingPenya, Penya, PenyaId, Prova, ProvaId,
    ProvaStatus, Season, WinDirection,
};
pub use lifecycle::{LifecycleError, ProvaTransition};
pub use normalizer::{normalize, NormalizedEntry};
pub use points::{points_for_rank, PointsRange, PointsTable, PointsTableError};
pub use ranker::{live_order, rank, RankingError};
pub use repository::{CircuitRepository, RepositoryError};
pub use roster::{parse_roster, parse_roster_file, slugify, NewPenya, RosterImportError};
pub use router::circuit_router;
pub use service::{
    CircuitService, CircuitServiceError, CloseOutcome, NewProva, PenyaSelection, PenyaUpdate,
    ResultUpdate, ValidationError,
};
pub use standings::{
    aggregate, DirectionChange, RankedPenya, StandingsSnapshot, StandingsTracker,
};
pub use views::{
    PenyaProvaSummary, PenyaSummary, ProvaBoard, ProvaView, PublicPenyaSummary, PublicStanding,
    HIDDEN,
};
