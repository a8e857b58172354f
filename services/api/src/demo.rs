use crate::infra::{parse_season, read_snapshot, InMemoryCircuitRepository};
use chrono::NaiveDate;
use circuit::competition::{
    aggregate, parse_roster_file, rank, ChallengeResult, ChallengeType, CircuitService,
    CircuitServiceError, DirectionChange, NewPenya, NewProva, ParticipatingPenya, PenyaSelection,
    PointsTable, Prova, ProvaBoard, PublicStanding, RankedPenya, ResultUpdate, Season,
    StandingsSnapshot, ValidationError, WinDirection,
};
use circuit::config::AppConfig;
use circuit::error::AppError;
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_PENYES: [&str; 6] = [
    "Els Bojos",
    "La Colla Vella",
    "Penya Barretina",
    "Els Esclafits",
    "Xaranga Desafinada",
    "La Secreta",
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Season year to seed. Defaults to CIRCUIT_SEASON or the current year.
    #[arg(long, value_parser = parse_season)]
    pub(crate) season: Option<Season>,
    /// Optional roster CSV (Name, Description, Secret) to use instead of the built-in teams.
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// JSON file holding `{ "prova": {...}, "entries": [...] }`
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the results as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StandingsArgs {
    /// JSON file holding `{ "penyes": [...], "results": { "<prova>": [...] } }`
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the standings as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

/// One exported event with its entry list.
#[derive(Debug, Deserialize)]
pub(crate) struct EventSnapshot {
    pub(crate) prova: Prova,
    #[serde(default)]
    pub(crate) entries: Vec<ParticipatingPenya>,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let snapshot: EventSnapshot = read_snapshot(&args.input)?;
    let results = rank_snapshot(&snapshot)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        render_results(&snapshot.prova, &results);
    }
    Ok(())
}

pub(crate) fn run_standings(args: StandingsArgs) -> Result<(), AppError> {
    let snapshot: StandingsSnapshot = read_snapshot(&args.input)?;
    let standings = aggregate(&snapshot.penyes, &snapshot.results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&standings)?);
    } else {
        render_standings(&standings);
    }
    Ok(())
}

pub(crate) fn rank_snapshot(snapshot: &EventSnapshot) -> Result<Vec<ChallengeResult>, AppError> {
    let prova = &snapshot.prova;
    prova
        .points_range
        .validate()
        .map_err(|err| CircuitServiceError::from(ValidationError::from(err)))?;

    Ok(rank(
        &snapshot.entries,
        prova.challenge_type,
        prova.win_direction,
        &prova.points_range,
    )?)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let season = match args.season {
        Some(season) => season,
        None => AppConfig::load()?.circuit.default_season,
    };

    let service = CircuitService::new(Arc::new(InMemoryCircuitRepository::default()));
    let added = match args.roster_csv {
        Some(path) => service.add_penyes(season, parse_roster_file(path)?)?,
        None => service.add_penyes(
            season,
            DEMO_PENYES
                .iter()
                .map(|name| NewPenya {
                    is_secret: *name == "La Secreta",
                    ..NewPenya::named(*name)
                })
                .collect(),
        )?,
    };

    println!("Circuit demo: season {season}");
    println!(
        "- {} teams on the roster ({} skipped)",
        added.iter().filter(|added| **added).count(),
        added.iter().filter(|added| !**added).count()
    );

    let mut standings = Vec::new();
    for (index, plan) in demo_events().into_iter().enumerate() {
        let prova = seed_event(&service, season, &plan, index as u32)?;
        let outcome = service.close_prova(season, &prova.id, true)?;

        if outcome.results.is_empty() {
            println!("\n{} ({}): not ranked yet", prova.name, prova.challenge_type.label());
        } else {
            render_results(&prova, &outcome.results);
        }
        if !outcome.missing.is_empty() {
            println!("  closed without results for: {}", outcome.missing.join(", "));
        }

        standings = service.standings(season)?;
    }

    let live = seed_event(&service, season, &DemoEvent::open_final(), 7)?;
    let view = service.prova_view(season, &live.id)?;
    if let ProvaBoard::Open { entries } = &view.board {
        println!(
            "\n{} ({}, provisional order)",
            view.prova.name,
            view.prova.status().label()
        );
        for entry in entries {
            println!(
                "  {:>2}. {:<24} {:>8}",
                entry.index.unwrap_or_default(),
                entry.name,
                entry.result.map_or_else(|| "-".to_string(), |value| format!("{value}"))
            );
        }
    }

    render_public_standings(
        &standings
            .iter()
            .map(RankedPenya::public_view)
            .collect::<Vec<_>>(),
    );
    Ok(())
}

struct DemoEvent {
    name: &'static str,
    challenge_type: ChallengeType,
    win_direction: WinDirection,
    day: u32,
    close: bool,
}

impl DemoEvent {
    fn open_final() -> Self {
        Self {
            name: "Gran Final",
            challenge_type: ChallengeType::Points,
            win_direction: WinDirection::Descending,
            day: 30,
            close: false,
        }
    }
}

fn demo_events() -> Vec<DemoEvent> {
    vec![
        DemoEvent {
            name: "Cursa de Sacs",
            challenge_type: ChallengeType::Time,
            win_direction: WinDirection::Ascending,
            day: 3,
            close: true,
        },
        DemoEvent {
            name: "Estirar la Corda",
            challenge_type: ChallengeType::Points,
            win_direction: WinDirection::Descending,
            day: 10,
            close: true,
        },
        DemoEvent {
            name: "Cercavila",
            challenge_type: ChallengeType::Participation,
            win_direction: WinDirection::None,
            day: 17,
            close: true,
        },
        DemoEvent {
            name: "Gimcana",
            challenge_type: ChallengeType::MultiEvent,
            win_direction: WinDirection::None,
            day: 24,
            close: true,
        },
    ]
}

/// Creates the event for every roster team and records synthetic results.
/// The last team never gets a measurement in closed events.
fn seed_event(
    service: &CircuitService<InMemoryCircuitRepository>,
    season: Season,
    plan: &DemoEvent,
    salt: u32,
) -> Result<Prova, AppError> {
    let roster = service.penyes(season)?;
    let start_date = NaiveDate::from_ymd_opt(season.0, 7, plan.day)
        .unwrap_or(NaiveDate::MIN);

    let prova = service.create_prova(
        season,
        NewProva {
            name: plan.name.to_string(),
            description: None,
            image_url: None,
            start_date,
            finish_date: None,
            location: None,
            challenge_type: plan.challenge_type,
            win_direction: plan.win_direction,
            points_range: PointsTable::standard(),
            is_secret: false,
            penyes: roster
                .iter()
                .map(|penya| PenyaSelection {
                    penya_id: penya.id.clone(),
                    participates: true,
                })
                .collect(),
        },
    )?;

    let scored = roster.len().saturating_sub(usize::from(plan.close));
    for (index, penya) in roster.iter().take(scored).enumerate() {
        let seed = (index as u32 + 1) * 37 + salt * 11;
        let result = match plan.challenge_type {
            ChallengeType::Time => f64::from(540 + seed % 97),
            ChallengeType::Participation => f64::from(u8::from(seed % 3 != 0)),
            _ => f64::from(seed % 41),
        };
        service.record_result(
            season,
            &prova.id,
            &penya.id,
            ResultUpdate {
                result: Some(result),
                participates: None,
            },
        )?;
    }

    Ok(prova)
}

fn render_results(prova: &Prova, results: &[ChallengeResult]) {
    match prova.win_direction {
        WinDirection::None => println!("\n{} ({})", prova.name, prova.challenge_type.label()),
        direction => println!(
            "\n{} ({}, {})",
            prova.name,
            prova.challenge_type.label(),
            direction.label()
        ),
    }
    for result in results {
        let measurement = result
            .result
            .filter(|value| *value > -1.0)
            .map(|value| format!("{value}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>2}. {:<24} {:>8} {:>4} pts",
            result.position, result.name, measurement, result.points_awarded
        );
    }
}

fn direction_marker(direction: Option<DirectionChange>) -> &'static str {
    match direction {
        Some(DirectionChange::Up) => "+",
        Some(DirectionChange::Down) => "-",
        Some(DirectionChange::Same) => "=",
        None => " ",
    }
}

fn render_standings(standings: &[RankedPenya]) {
    println!("\nStandings");
    for row in standings {
        println!(
            "  {:>2}. {} {:<24} {:>4} pts",
            row.position,
            direction_marker(row.direction_change),
            row.name,
            row.total_points
        );
    }
}

fn render_public_standings(standings: &[PublicStanding]) {
    println!("\nStandings");
    for row in standings {
        let points = row
            .total_points
            .map(|points| format!("{points:>4} pts"))
            .unwrap_or_else(|| "   ? pts".to_string());
        println!(
            "  {:>2}. {} {:<24} {}",
            row.position,
            direction_marker(row.direction_change),
            row.name,
            points
        );
    }
}
