use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ArenaConfig, ConfigError};
use crate::constants::TEAM_COUNT;
use crate::player::{AgentError, Player, PlayerInit};
use crate::results::GameResult;
use crate::rng::Rng;
use crate::types::{Move, Point, RuntimeEvent, Team, TelemetryFrame};

mod boundary;
mod rat_dynamics;
mod sanitizer;
mod snapshot;

pub use self::boundary::{resolve_piper, resolve_rat, RatOutcome};
pub use self::rat_dynamics::{dominant_team, propose_displacement};
pub use self::sanitizer::{sanitize_move, Sanitized};
pub use self::snapshot::ArenaView;

use self::snapshot::{rat_telemetry, team_telemetry};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{} agent failed: {reason}", team.label())]
    AgentFailure { team: Team, reason: String },

    #[error("no valid players to play game")]
    NoValidPlayers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingMoves,
    Sanitizing,
    AdvancingRats,
    AdvancingPipers,
    Scored,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Piper {
    pub pos: Point,
    /// Sanitized move applied on the most recent tick.
    pub last_move: Move,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rat {
    pub pos: Point,
    pub angle: f64,
    /// Draw a fresh heading the next time no team dominates this rat.
    pub reroll_heading: bool,
    pub tune: Option<Team>,
}

pub struct GameEntrant {
    pub group: String,
    pub player: Box<dyn Player>,
}

impl GameEntrant {
    pub fn new(group: impl Into<String>, player: Box<dyn Player>) -> Self {
        Self {
            group: group.into(),
            player,
        }
    }
}

struct TeamSlot {
    group: String,
    /// `None` once the agent failed during init.
    player: Option<Box<dyn Player>>,
}

pub struct GameEngine {
    pub config: ArenaConfig,

    rng: Rng,
    slots: Vec<TeamSlot>,
    pipers: Vec<Vec<Piper>>,
    rats: Vec<Rat>,
    scores: [u32; TEAM_COUNT],
    view: ArenaView,
    events: Vec<RuntimeEvent>,

    phase: TurnPhase,
    tick: u64,
    turns_left: Option<u64>,
    ended: bool,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "agent panicked".to_string()
}

/// Runs agent code, turning a panic into an ordinary agent error.
fn guarded<T>(call: impl FnOnce() -> Result<T, AgentError>) -> Result<T, AgentError> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(AgentError::new(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn compact_rats(rats: &mut Vec<Rat>, captured: &[bool]) -> usize {
    let before = rats.len();
    let mut idx = 0;
    rats.retain(|_| {
        let keep = !captured[idx];
        idx += 1;
        keep
    });
    before - rats.len()
}

fn spawn_rats(config: &ArenaConfig, rng: &mut Rng) -> Vec<Rat> {
    // positions on a 0.001 grid strictly inside the inner square
    let cells = ((config.inner_side * 1000.0).floor() as i64 - 2).max(1);
    let half = config.inner_half();
    (0..config.rats)
        .map(|_| {
            let x = rng.int(0, cells - 1) as f64 * 0.001 - half;
            let y = rng.int(0, cells - 1) as f64 * 0.001 - half;
            Rat {
                pos: Point::new(x, y),
                angle: rng.angle(),
                reroll_heading: false,
                tune: None,
            }
        })
        .collect()
}

impl GameEngine {
    pub fn new(
        config: ArenaConfig,
        entrants: [GameEntrant; TEAM_COUNT],
        seed: u32,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = Rng::new(seed);

        let pipers: Vec<Vec<Piper>> = (0..TEAM_COUNT)
            .map(|team_idx| {
                (0..config.pipers_per_team)
                    .map(|p| {
                        let (x, y) = config.piper_start(team_idx, p);
                        Piper {
                            pos: Point::new(x, y),
                            last_move: Move::ZERO,
                        }
                    })
                    .collect()
            })
            .collect();
        let rats = spawn_rats(&config, &mut rng);

        let slots = entrants
            .into_iter()
            .map(|entrant| TeamSlot {
                group: entrant.group,
                player: Some(entrant.player),
            })
            .collect();

        let turns_left = config.turn_budget;
        let mut engine = Self {
            config,
            rng,
            slots,
            pipers,
            rats,
            scores: [0; TEAM_COUNT],
            view: ArenaView::default(),
            events: Vec::new(),
            phase: TurnPhase::AwaitingMoves,
            tick: 0,
            turns_left,
            ended: turns_left == Some(0),
        };
        engine.init_players()?;
        Ok(engine)
    }

    fn init_players(&mut self) -> Result<(), EngineError> {
        self.view.refresh(&self.pipers, &self.rats);
        for (team, slot) in Team::ALL.into_iter().zip(self.slots.iter_mut()) {
            let Some(player) = slot.player.as_mut() else {
                continue;
            };
            let init = PlayerInit {
                team,
                arena_side: self.config.inner_side,
                turn_budget: self.config.turn_budget,
                view: &self.view,
            };
            let Err(error) = guarded(|| player.init(init)) else {
                continue;
            };
            warn!(team = team.label(), group = %slot.group, %error, "agent failed during init");
            if self.config.strict {
                return Err(EngineError::AgentFailure {
                    team,
                    reason: error.0,
                });
            }
            self.events.push(RuntimeEvent::AgentFailure {
                team,
                reason: error.0,
            });
            slot.player = None;
        }
        if self.slots.iter().all(|slot| slot.player.is_none()) {
            return Err(EngineError::NoValidPlayers);
        }
        Ok(())
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn turns_left(&self) -> Option<u64> {
        self.turns_left
    }

    pub fn scores(&self) -> [u32; TEAM_COUNT] {
        self.scores
    }

    pub fn rats(&self) -> &[Rat] {
        &self.rats
    }

    pub fn pipers(&self, team: Team) -> &[Piper] {
        &self.pipers[team.index()]
    }

    pub fn groups(&self) -> [String; TEAM_COUNT] {
        [0, 1, 2, 3].map(|idx| self.slots[idx].group.clone())
    }

    /// Advances the game by one tick. A no-op once the game has ended.
    pub fn step(&mut self) -> Result<(), EngineError> {
        if self.ended {
            return Ok(());
        }
        self.tick += 1;
        debug!(tick = self.tick, "tick started");

        self.phase = TurnPhase::AwaitingMoves;
        self.view.refresh(&self.pipers, &self.rats);
        let proposals = self.collect_moves()?;

        self.phase = TurnPhase::Sanitizing;
        self.apply_sanitized(proposals);

        let (scores_before, rats_before) = (self.scores, self.rats.len());
        self.phase = TurnPhase::AdvancingRats;
        self.advance_rats();

        self.phase = TurnPhase::AdvancingPipers;
        self.advance_pipers();

        self.phase = TurnPhase::Scored;
        self.finish_tick(scores_before, rats_before);
        Ok(())
    }

    fn collect_moves(&mut self) -> Result<Vec<Vec<Option<Move>>>, EngineError> {
        let mut proposals = Vec::with_capacity(TEAM_COUNT);
        for (team, slot) in Team::ALL.into_iter().zip(self.slots.iter_mut()) {
            let count = self.pipers[team.index()].len();
            let Some(player) = slot.player.as_mut() else {
                proposals.push(vec![Some(Move::ZERO); count]);
                continue;
            };
            let view = &self.view;
            match guarded(|| player.play(view)) {
                Ok(moves) => {
                    let mut padded: Vec<Option<Move>> =
                        moves.into_iter().take(count).map(Some).collect();
                    padded.resize(count, None);
                    proposals.push(padded);
                }
                Err(error) => {
                    warn!(
                        tick = self.tick,
                        team = team.label(),
                        group = %slot.group,
                        %error,
                        "agent failed during play"
                    );
                    if self.config.strict {
                        self.ended = true;
                        return Err(EngineError::AgentFailure {
                            team,
                            reason: error.0,
                        });
                    }
                    self.events.push(RuntimeEvent::AgentFailure {
                        team,
                        reason: error.0,
                    });
                    proposals.push(vec![Some(Move::ZERO); count]);
                }
            }
        }
        Ok(proposals)
    }

    fn apply_sanitized(&mut self, proposals: Vec<Vec<Option<Move>>>) {
        for (team, team_moves) in Team::ALL.into_iter().zip(proposals) {
            for (idx, proposed) in team_moves.into_iter().enumerate() {
                let mv = match sanitize_move(proposed, &self.config) {
                    Sanitized::Accepted(mv) => mv,
                    Sanitized::Clamped { mv, length } => {
                        debug!(team = team.label(), piper = idx, length, "fixed move over speed limit");
                        self.events.push(RuntimeEvent::MoveClamped {
                            team,
                            piper: idx,
                            length,
                        });
                        mv
                    }
                    Sanitized::Invalid => {
                        warn!(team = team.label(), piper = idx, "invalid move");
                        self.events
                            .push(RuntimeEvent::InvalidMove { team, piper: idx });
                        Move::ZERO
                    }
                };
                self.pipers[team.index()][idx].last_move = mv;
            }
        }
    }

    fn advance_rats(&mut self) {
        let signaling: Vec<Vec<Point>> = self
            .pipers
            .iter()
            .map(|team| {
                team.iter()
                    .filter(|piper| piper.last_move.play)
                    .map(|piper| piper.pos)
                    .collect()
            })
            .collect();

        let mut captured = vec![false; self.rats.len()];
        for (idx, rat) in self.rats.iter_mut().enumerate() {
            let (dx, dy) = propose_displacement(rat, &signaling, &self.config, &mut self.rng);
            let outcome = resolve_rat(
                &self.config,
                rat.pos,
                dx,
                dy,
                &mut rat.angle,
                &mut self.events,
            );
            match outcome {
                RatOutcome::Captured { team, x, y } => {
                    self.scores[team.index()] += 1;
                    captured[idx] = true;
                    info!(tick = self.tick, team = team.label(), x, y, "rat caught");
                    self.events.push(RuntimeEvent::RatCaptured { team, x, y });
                }
                RatOutcome::Moved { dx, dy } => {
                    if dx == 0.0 && dy == 0.0 {
                        debug!(x = rat.pos.x, y = rat.pos.y, "rat is still");
                    } else {
                        rat.pos = rat.pos.offset(dx, dy);
                    }
                }
            }
        }

        let before = self.rats.len();
        let removed = compact_rats(&mut self.rats, &captured);
        debug_assert_eq!(removed, captured.iter().filter(|c| **c).count());
        debug_assert_eq!(self.rats.len(), before - removed);
    }

    fn advance_pipers(&mut self) {
        for (team, team_pipers) in Team::ALL.into_iter().zip(self.pipers.iter_mut()) {
            for (idx, piper) in team_pipers.iter_mut().enumerate() {
                let (dx, dy) = resolve_piper(
                    &self.config,
                    team,
                    idx,
                    piper.pos,
                    piper.last_move,
                    &mut self.events,
                );
                if dx == 0.0 && dy == 0.0 {
                    debug!(
                        team = team.label(),
                        piper = idx,
                        x = piper.pos.x,
                        y = piper.pos.y,
                        "piper is still"
                    );
                    continue;
                }
                piper.pos = piper.pos.offset(dx, dy);
            }
        }
    }

    fn finish_tick(&mut self, scores_before: [u32; TEAM_COUNT], rats_before: usize) {
        if let Some(left) = self.turns_left.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.ended = true;
            }
        }
        if self.rats.is_empty() {
            self.ended = true;
        }

        if cfg!(debug_assertions) {
            debug_assert!(self
                .scores
                .iter()
                .zip(scores_before)
                .all(|(now, before)| *now >= before));
            debug_assert!(self.rats.len() <= rats_before);
            let outer = self.config.outer_half();
            for rat in &self.rats {
                debug_assert!(rat.pos.x.abs() <= outer && rat.pos.y.abs() <= outer);
            }
            for piper in self.pipers.iter().flatten() {
                debug_assert!(piper.pos.x.abs() <= outer && piper.pos.y.abs() <= outer);
            }
        }

        if self.ended {
            info!(
                tick = self.tick,
                scores = ?self.scores,
                rats_left = self.rats.len(),
                "game over"
            );
        }
    }

    /// Telemetry for the current state. With `include_events` the events
    /// recorded since the previous drain are moved into the frame.
    pub fn build_frame(&mut self, include_events: bool) -> TelemetryFrame {
        let scale = self.config.outer_half();
        let teams = Team::ALL
            .into_iter()
            .map(|team| {
                team_telemetry(
                    team,
                    &self.slots[team.index()].group,
                    self.scores[team.index()],
                    &self.pipers[team.index()],
                    scale,
                )
            })
            .collect();
        TelemetryFrame {
            tick: self.tick,
            turns_left: self.turns_left,
            side_ratio: self.config.inner_side / self.config.outer_margin,
            ended: self.ended,
            teams,
            rats: rat_telemetry(&self.rats, scale),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_result(&self) -> GameResult {
        GameResult::new(&self.config, self.groups(), self.scores, self.tick)
    }
}
