use crate::demo::{run_demo, run_rank, run_standings, DemoArgs, RankArgs, StandingsArgs};
use crate::server;
use circuit::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Circuit",
    about = "Rank events and compute season standings for the Circuit",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Rank one event from an exported JSON snapshot
    Rank(RankArgs),
    /// Aggregate season standings from an exported JSON snapshot
    Standings(StandingsArgs),
    /// Seed an in-memory season, close its events and print the standings
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rank(args) => run_rank(args),
        Command::Standings(args) => run_standings(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["circuit-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn rank_requires_an_input_file() {
        assert!(Cli::try_parse_from(["circuit-api", "rank"]).is_err());
        let cli = Cli::try_parse_from(["circuit-api", "rank", "--input", "cursa.json"])
            .expect("parses");
        assert!(matches!(cli.command, Some(Command::Rank(_))));
    }
}
