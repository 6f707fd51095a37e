//! Batch play: a host group in the north slot against every three-group
//! seating drawn from a pool, several seeded trials per seating.

use std::io;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::ArenaConfig;
use crate::constants::{SEED_STRIDE, TEAM_COUNT, UNBOUNDED_TICK_SAFETY};
use crate::engine::{EngineError, GameEngine, GameEntrant};
use crate::results::{GameResult, ResultStore};
use crate::strategy;

#[derive(Error, Debug)]
pub enum TournamentError {
    #[error("pool needs at least 3 groups, got {0}")]
    PoolTooSmall(usize),
    #[error("trials must be at least 1")]
    NoTrials,
    #[error("unknown group {name:?} (known: {known})")]
    UnknownGroup { name: String, known: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("result write failed: {0}")]
    Io(#[from] io::Error),
}

/// One finished game of a tournament.
#[derive(Clone, Debug)]
pub struct TournamentGame {
    pub seating: usize,
    pub trial: u32,
    pub seed: u32,
    pub result: GameResult,
}

#[derive(Clone, Debug)]
pub struct Tournament {
    host: String,
    pool: Vec<String>,
    trials: u32,
    base_seed: u32,
}

impl Tournament {
    pub fn new(
        host: impl Into<String>,
        pool: Vec<String>,
        trials: u32,
        base_seed: u32,
    ) -> Result<Self, TournamentError> {
        let host = host.into();
        if pool.len() < TEAM_COUNT - 1 {
            return Err(TournamentError::PoolTooSmall(pool.len()));
        }
        if trials == 0 {
            return Err(TournamentError::NoTrials);
        }
        if let Some(name) = std::iter::once(&host)
            .chain(&pool)
            .find(|name| strategy::by_name(name).is_none())
        {
            return Err(TournamentError::UnknownGroup {
                name: name.clone(),
                known: strategy::STRATEGY_NAMES.join(", "),
            });
        }
        Ok(Self {
            host,
            pool,
            trials,
            base_seed,
        })
    }

    /// Every seating in pool order: host north, then pool entries
    /// `i < j < k` in the east, south and west slots.
    pub fn seatings(&self) -> Vec<[String; TEAM_COUNT]> {
        let n = self.pool.len();
        let mut seatings = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    seatings.push([
                        self.host.clone(),
                        self.pool[i].clone(),
                        self.pool[j].clone(),
                        self.pool[k].clone(),
                    ]);
                }
            }
        }
        seatings
    }

    /// Seed of the `trial`-th game of seating `seating`; the first game uses
    /// the base seed unchanged.
    pub fn game_seed(&self, seating: usize, trial: u32) -> u32 {
        let index = (seating as u32).wrapping_mul(self.trials).wrapping_add(trial);
        self.base_seed.wrapping_add(index.wrapping_mul(SEED_STRIDE))
    }

    /// Plays every game, appending each result to `store` and a separator
    /// after each seating. `on_game` sees every game as it finishes.
    pub fn run(
        &self,
        config: &ArenaConfig,
        store: &ResultStore,
        mut on_game: impl FnMut(&TournamentGame),
    ) -> Result<Vec<TournamentGame>, TournamentError> {
        let seatings = self.seatings();
        info!(
            host = %self.host,
            seatings = seatings.len(),
            trials = self.trials,
            base_seed = self.base_seed,
            "tournament starting"
        );

        let mut games = Vec::with_capacity(seatings.len() * self.trials as usize);
        for (seating, groups) in seatings.iter().enumerate() {
            for trial in 0..self.trials {
                let seed = self.game_seed(seating, trial);
                let entrants = entrants_for(groups)?;
                let mut engine = GameEngine::new(config.clone(), entrants, seed)?;
                play_out(&mut engine)?;
                let result = engine.build_result();
                store.append(&result)?;
                info!(
                    seating,
                    trial,
                    seed,
                    winner = %result.winner,
                    scores = ?result.scores,
                    "tournament game finished"
                );
                let game = TournamentGame {
                    seating,
                    trial,
                    seed,
                    result,
                };
                on_game(&game);
                games.push(game);
            }
            store.append_separator()?;
        }
        Ok(games)
    }
}

fn entrants_for(
    groups: &[String; TEAM_COUNT],
) -> Result<[GameEntrant; TEAM_COUNT], TournamentError> {
    let entrant = |name: &String| {
        strategy::by_name(name)
            .map(|player| GameEntrant::new(name.clone(), player))
            .ok_or_else(|| TournamentError::UnknownGroup {
                name: name.clone(),
                known: strategy::STRATEGY_NAMES.join(", "),
            })
    };
    let [north, east, south, west] = groups.each_ref().map(entrant);
    Ok([north?, east?, south?, west?])
}

/// Steps `engine` until it ends, or until the safety limit when it has no
/// turn budget.
pub fn play_out(engine: &mut GameEngine) -> Result<(), EngineError> {
    while !engine.is_ended() {
        engine.step()?;
        if engine.turns_left().is_none() && engine.tick() >= UNBOUNDED_TICK_SAFETY {
            warn!(tick = engine.tick(), "tick safety limit exceeded");
            break;
        }
    }
    Ok(())
}
