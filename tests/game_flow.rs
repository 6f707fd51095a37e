use piper_arena::config::ArenaConfig;
use piper_arena::engine::{ArenaView, GameEngine, GameEntrant, TurnPhase};
use piper_arena::player::{AgentError, Player, PlayerInit};
use piper_arena::results::ResultStore;
use piper_arena::strategy;
use piper_arena::tournament::Tournament;
use piper_arena::types::{Move, RuntimeEvent, Team};

fn entrants(names: [&str; 4]) -> [GameEntrant; 4] {
    names.map(|name| {
        GameEntrant::new(
            name,
            strategy::by_name(name).expect("built-in strategy should exist"),
        )
    })
}

fn config(ticks: u64) -> ArenaConfig {
    ArenaConfig {
        turn_budget: Some(ticks),
        ..ArenaConfig::default()
    }
}

fn assert_positions_in_bounds(engine: &GameEngine) {
    let inner = engine.config.inner_half();
    let outer = engine.config.outer_half();
    for rat in engine.rats() {
        assert!(rat.pos.x.abs() <= inner, "rat escaped: {:?}", rat.pos);
        assert!(rat.pos.y.abs() <= inner, "rat escaped: {:?}", rat.pos);
        assert!((0.0..std::f64::consts::TAU).contains(&rat.angle));
    }
    for team in Team::ALL {
        for piper in engine.pipers(team) {
            assert!(piper.pos.x.abs() <= outer && piper.pos.y.abs() <= outer);
        }
    }
}

#[test]
fn idle_teams_play_out_the_budget_without_moving() {
    let mut engine =
        GameEngine::new(config(200), entrants(["idle", "idle", "idle", "idle"]), 2024)
            .expect("engine starts");
    let start: Vec<_> = Team::ALL
        .iter()
        .map(|team| engine.pipers(*team).to_vec())
        .collect();
    let initial_rats = engine.rats().len();

    while !engine.is_ended() {
        engine.step().expect("tick");
        assert_eq!(engine.phase(), TurnPhase::Scored);
        let scored: u32 = engine.scores().iter().sum();
        assert_eq!(scored as usize + engine.rats().len(), initial_rats);
        assert_positions_in_bounds(&engine);
        let frame = engine.build_frame(true);
        assert!(frame.rats.iter().all(|rat| rat.tune.is_none()));
    }

    assert_eq!(engine.tick(), 200);
    assert_eq!(engine.turns_left(), Some(0));
    for (idx, team) in Team::ALL.iter().enumerate() {
        assert_eq!(engine.pipers(*team), start[idx].as_slice());
    }
}

#[test]
fn sweepers_keep_invariants_and_never_lose_points() {
    let mut engine = GameEngine::new(
        config(3_000),
        entrants(["sweeper", "idle", "sweeper", "idle"]),
        77,
    )
    .expect("engine starts");
    let initial_rats = engine.rats().len();
    let mut previous = engine.scores();

    while !engine.is_ended() {
        engine.step().expect("tick");
        let scores = engine.scores();
        for (now, before) in scores.iter().zip(previous) {
            assert!(*now >= before);
        }
        previous = scores;
        let scored: u32 = scores.iter().sum();
        assert_eq!(scored as usize + engine.rats().len(), initial_rats);
        assert_positions_in_bounds(&engine);

        let frame = engine.build_frame(true);
        assert!(!frame.events.iter().any(|event| matches!(
            event,
            RuntimeEvent::InvalidMove { .. } | RuntimeEvent::AgentFailure { .. }
        )));
    }

    let result = engine.build_result();
    assert_eq!(result.total, previous.iter().sum::<u32>());
    assert_eq!(result.groups[1], "idle");
}

#[test]
fn identical_seeds_replay_identically() {
    let run = |seed: u32| {
        let mut engine = GameEngine::new(
            config(600),
            entrants(["sweeper", "sweeper", "idle", "sweeper"]),
            seed,
        )
        .expect("engine starts");
        let mut frames = Vec::new();
        while !engine.is_ended() {
            engine.step().expect("tick");
            let frame = engine.build_frame(true);
            frames.push(serde_json::to_string(&frame).expect("frame serializes"));
        }
        frames
    };

    let first = run(31_337);
    assert_eq!(first, run(31_337));
    assert_ne!(first, run(31_338));
}

struct Flaky {
    calls: u32,
}

impl Player for Flaky {
    fn init(&mut self, _init: PlayerInit<'_>) -> Result<(), AgentError> {
        Ok(())
    }

    fn play(&mut self, view: &ArenaView) -> Result<Vec<Move>, AgentError> {
        self.calls += 1;
        match self.calls % 3 {
            0 => panic!("flaky agent panicked on call {}", self.calls),
            1 => Err(AgentError::new("flaky agent gave up")),
            _ => Ok(vec![Move::new(0.0, -0.5, false); view.team_pipers(Team::North).len()]),
        }
    }
}

#[test]
fn misbehaving_agent_is_contained() {
    let mut engine = GameEngine::new(
        config(30),
        [
            GameEntrant::new("flaky", Box::new(Flaky { calls: 0 })),
            GameEntrant::new("idle", Box::new(strategy::Idle::default())),
            GameEntrant::new("idle", Box::new(strategy::Idle::default())),
            GameEntrant::new("idle", Box::new(strategy::Idle::default())),
        ],
        9,
    )
    .expect("engine starts");
    let start_y = engine.pipers(Team::North)[0].pos.y;

    let mut failures = 0;
    while !engine.is_ended() {
        engine.step().expect("non-strict games keep going");
        failures += engine
            .build_frame(true)
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::AgentFailure { team: Team::North, .. }))
            .count();
    }

    assert_eq!(failures, 20);
    // only every third tick produced a real move
    let moved = start_y - engine.pipers(Team::North)[0].pos.y;
    assert!((moved - 10.0 * 0.5).abs() < 1e-9, "moved {moved}");
}

#[test]
fn finished_games_accumulate_in_the_result_file() {
    let dir = std::env::temp_dir().join(format!(
        "piper-arena-flow-{}-{}",
        std::process::id(),
        rand::random::<u32>()
    ));
    let store = ResultStore::new(dir.join("results.csv"));

    for seed in [1, 2] {
        let mut engine =
            GameEngine::new(config(20), entrants(["idle", "sweeper", "idle", "idle"]), seed)
                .expect("engine starts");
        while !engine.is_ended() {
            engine.step().expect("tick");
        }
        store.append(&engine.build_result()).expect("append result");
    }

    let text = std::fs::read_to_string(dir.join("results.csv")).expect("result file exists");
    assert_eq!(text.lines().count(), 2);
    assert!(text
        .lines()
        .all(|line| line.starts_with("100,10,2,idle,sweeper,idle,idle,")));

    let standings = store.standings().expect("standings load");
    assert_eq!(standings["idle"].games, 6);
    assert_eq!(standings["sweeper"].games, 2);
    let wins: u32 = standings.values().map(|standing| standing.wins).sum();
    assert_eq!(wins, 2);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn four_sweepers_lure_rats_home() {
    let mut engine = GameEngine::new(
        config(1_000_000),
        entrants(["sweeper", "sweeper", "sweeper", "sweeper"]),
        1,
    )
    .expect("engine starts");
    while !engine.is_ended() {
        engine.step().expect("tick");
    }

    let result = engine.build_result();
    assert!(result.total > 0, "scores {:?}", result.scores);
    assert_eq!(result.total as usize + engine.rats().len(), 10);
}

#[test]
fn tournament_appends_every_game_and_a_separator_per_seating() {
    let dir = std::env::temp_dir().join(format!(
        "piper-arena-tournament-{}-{}",
        std::process::id(),
        rand::random::<u32>()
    ));
    let store = ResultStore::new(dir.join("result.csv"));
    let pool = ["idle", "sweeper", "idle", "sweeper"].map(str::to_string).to_vec();
    let tournament = Tournament::new("sweeper", pool, 2, 11).expect("valid tournament");

    let mut seen = Vec::new();
    let games = tournament
        .run(&config(50), &store, |game| seen.push(game.seed))
        .expect("tournament runs");

    assert_eq!(games.len(), 8);
    assert_eq!(seen, games.iter().map(|game| game.seed).collect::<Vec<_>>());
    assert_eq!(games[0].seed, 11);
    assert!(games.iter().all(|game| game.result.ticks == 50));
    assert!(games.iter().all(|game| game.result.groups[0] == "sweeper"));

    let text = std::fs::read_to_string(dir.join("result.csv")).expect("result file exists");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 12);
    for block in lines.chunks(3) {
        assert!(!block[0].is_empty() && !block[1].is_empty());
        assert!(block[2].is_empty());
    }

    let standings = store.standings().expect("standings load");
    assert_eq!(standings["sweeper"].games, 20);
    assert_eq!(standings["idle"].games, 12);
    let wins: u32 = standings.values().map(|standing| standing.wins).sum();
    assert_eq!(wins, 8);
    let points: u32 = standings.values().map(|standing| standing.points).sum();
    assert_eq!(points, games.iter().map(|game| game.result.total).sum::<u32>());

    let _ = std::fs::remove_dir_all(dir);
}
