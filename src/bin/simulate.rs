use clap::Parser;
use piper_arena::config::ArenaConfig;
use piper_arena::constants::{
    ticks_for_turns, DEFAULT_INNER_SIDE, DEFAULT_PIPERS_PER_TEAM, DEFAULT_RATS, DEFAULT_TRIALS,
    TEAM_COUNT, UNBOUNDED_TICK_SAFETY,
};
use piper_arena::engine::{EngineError, GameEngine, GameEntrant};
use piper_arena::results::{GameResult, ResultStore};
use piper_arena::strategy;
use piper_arena::tournament::{Tournament, TournamentError, TournamentGame};
use piper_arena::types::{RuntimeEvent, TelemetryFrame};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Strategy for the north, east, south and west team, in that order.
    #[arg(
        short,
        long,
        num_args = 4,
        value_names = ["NORTH", "EAST", "SOUTH", "WEST"],
        default_values = ["sweeper", "sweeper", "sweeper", "sweeper"]
    )]
    groups: Vec<String>,
    #[arg(short, long, default_value_t = DEFAULT_PIPERS_PER_TEAM)]
    pipers: usize,
    #[arg(short, long, default_value_t = DEFAULT_RATS)]
    rats: usize,
    /// Turn limit; every turn is ten ticks. Unlimited when omitted.
    #[arg(short, long)]
    turns: Option<u64>,
    #[arg(short, long, default_value_t = DEFAULT_INNER_SIDE)]
    side: f64,
    #[arg(long)]
    seed: Option<u64>,
    /// Abort on the first agent failure instead of zeroing that team's moves.
    #[arg(long)]
    strict: bool,
    /// Append the result as a CSV line to this file.
    #[arg(long)]
    results: Option<PathBuf>,
    /// Print every telemetry frame as a JSON line.
    #[arg(long)]
    frames: bool,
    /// Run a tournament: the first group hosts in the north slot against
    /// every three-group combination of this pool.
    #[arg(long, num_args = 3.., value_name = "GROUP", requires = "results")]
    pool: Vec<String>,
    /// Games per pool combination in tournament mode.
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ResultLine {
    seed: u32,
    #[serde(rename = "invalidMoves")]
    invalid_moves: usize,
    #[serde(rename = "agentFailures")]
    agent_failures: usize,
    #[serde(flatten)]
    result: GameResult,
}

#[derive(Clone, Debug, Serialize)]
struct TournamentLine<'a> {
    seating: usize,
    trial: u32,
    seed: u32,
    #[serde(flatten)]
    result: &'a GameResult,
}

#[derive(Clone, Debug, Default)]
struct EventTally {
    invalid_moves: usize,
    agent_failures: usize,
}

impl EventTally {
    fn record(&mut self, frame: &TelemetryFrame) {
        for event in &frame.events {
            match event {
                RuntimeEvent::InvalidMove { .. } => self.invalid_moves += 1,
                RuntimeEvent::AgentFailure { .. } => self.agent_failures += 1,
                _ => {}
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries result lines, logs go to stderr
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "error during setup");
            std::process::exit(1);
        }
    };
    if !cli.pool.is_empty() {
        run_tournament(&cli, &config, seed);
        return;
    }

    let entrants = match build_entrants(&cli.groups) {
        Ok(entrants) => entrants,
        Err(message) => {
            error!(%message, "error during setup");
            std::process::exit(1);
        }
    };

    info!(
        north = %cli.groups[0],
        east = %cli.groups[1],
        south = %cli.groups[2],
        west = %cli.groups[3],
        side = config.inner_side,
        pipers = config.pipers_per_team,
        rats = config.rats,
        ticks = ?config.turn_budget,
        seed,
        strict = config.strict,
        "game starting"
    );

    let (result, tally) = match run_game(config, entrants, seed, cli.frames) {
        Ok(outcome) => outcome,
        Err(error) => {
            error!(%error, "error during play");
            std::process::exit(1);
        }
    };

    for (group, score) in result.groups.iter().zip(result.scores) {
        info!(%group, score, "group scored");
    }

    if let Some(path) = cli.results.as_ref() {
        if let Err(error) = ResultStore::new(path.clone()).append(&result) {
            error!(path = %path.display(), %error, "result write failed");
            std::process::exit(2);
        }
    }

    let line = ResultLine {
        seed,
        invalid_moves: tally.invalid_moves,
        agent_failures: tally.agent_failures,
        result,
    };
    match serde_json::to_string(&line) {
        Ok(text) => println!("{text}"),
        Err(error) => {
            error!(%error, "result serialization failed");
            std::process::exit(2);
        }
    }
}

fn run_tournament(cli: &Cli, config: &ArenaConfig, seed: u32) {
    let Some(path) = cli.results.as_ref() else {
        error!("tournament mode needs --results");
        std::process::exit(1);
    };
    let tournament = Tournament::new(cli.groups[0].clone(), cli.pool.clone(), cli.trials, seed);
    let tournament = match tournament {
        Ok(tournament) => tournament,
        Err(error) => {
            error!(%error, "error during setup");
            std::process::exit(1);
        }
    };
    let store = ResultStore::new(path.clone());

    let print_game = |game: &TournamentGame| {
        let line = TournamentLine {
            seating: game.seating,
            trial: game.trial,
            seed: game.seed,
            result: &game.result,
        };
        match serde_json::to_string(&line) {
            Ok(text) => println!("{text}"),
            Err(error) => warn!(%error, seed = game.seed, "result serialization failed"),
        }
    };
    match tournament.run(config, &store, print_game) {
        Ok(games) => info!(games = games.len(), "tournament finished"),
        Err(TournamentError::Io(error)) => {
            error!(path = %path.display(), %error, "result write failed");
            std::process::exit(2);
        }
        Err(error) => {
            error!(%error, "error during play");
            std::process::exit(1);
        }
    }

    match store.standings() {
        Ok(standings) => {
            for (group, standing) in standings {
                info!(
                    %group,
                    games = standing.games,
                    wins = standing.wins,
                    points = standing.points,
                    "standing"
                );
            }
        }
        Err(error) => warn!(path = %path.display(), %error, "standings unreadable"),
    }
}

fn build_config(cli: &Cli) -> Result<ArenaConfig, EngineError> {
    let config = ArenaConfig {
        inner_side: cli.side,
        pipers_per_team: cli.pipers,
        rats: cli.rats,
        turn_budget: cli.turns.map(ticks_for_turns),
        strict: cli.strict,
        ..ArenaConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn build_entrants(groups: &[String]) -> Result<[GameEntrant; TEAM_COUNT], String> {
    let mut entrants = Vec::with_capacity(TEAM_COUNT);
    for name in groups {
        let player = strategy::by_name(name).ok_or_else(|| {
            format!(
                "unknown group {name:?} (known: {})",
                strategy::STRATEGY_NAMES.join(", ")
            )
        })?;
        entrants.push(GameEntrant::new(name.clone(), player));
    }
    entrants
        .try_into()
        .map_err(|rest: Vec<GameEntrant>| format!("expected 4 groups, got {}", rest.len()))
}

fn run_game(
    config: ArenaConfig,
    entrants: [GameEntrant; TEAM_COUNT],
    seed: u32,
    print_frames: bool,
) -> Result<(GameResult, EventTally), EngineError> {
    let mut engine = GameEngine::new(config, entrants, seed)?;
    let mut tally = EventTally::default();

    while !engine.is_ended() {
        engine.step()?;
        let frame = engine.build_frame(true);
        tally.record(&frame);
        if print_frames {
            match serde_json::to_string(&frame) {
                Ok(text) => println!("{text}"),
                Err(error) => warn!(%error, tick = frame.tick, "frame serialization failed"),
            }
        }
        if engine.turns_left().is_none() && engine.tick() >= UNBOUNDED_TICK_SAFETY {
            warn!(tick = engine.tick(), "tick safety limit exceeded");
            break;
        }
    }

    Ok((engine.build_result(), tally))
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
