//! Ranking and standings engine for the Circuit: a season of scored events
//! ("proves") contested by teams ("penyes").

pub mod competition;
pub mod config;
pub mod error;
pub mod telemetry;
