use tracing::trace;

use crate::engine::ArenaView;
use crate::player::{AgentError, Player, PlayerInit};
use crate::types::{Move, Point, Team};

use super::{move_toward, to_local, to_world};

const ARRIVE: f64 = 1e-6;
const OUTSIDE_DEPTH: f64 = 1.5;
const INSIDE_DEPTH: f64 = 2.0;
const EXIT_DEPTH: f64 = 3.0;
const LINE_UP_DEPTH: f64 = 0.25;
const CATCH_RANGE: f64 = 1.0;

/// Per-piper plan, always expressed in the team-local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SweepState {
    ToGate,
    Enter { target: Point },
    Hunt,
    Return,
}

/// What one piper knows when deciding, in the team-local frame.
#[derive(Clone, Copy, Debug)]
pub struct Observation<'a> {
    pub pos: Point,
    pub rats: &'a [Point],
    /// Half of the inner square side.
    pub half: f64,
}

impl Observation<'_> {
    fn closest_rat(&self) -> Option<(Point, f64)> {
        self.rats
            .iter()
            .map(|rat| (*rat, self.pos.distance(*rat)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

fn next_state(state: SweepState, obs: &Observation<'_>) -> SweepState {
    let inside = Point::new(0.0, obs.half - INSIDE_DEPTH);
    match state {
        SweepState::ToGate => {
            let outside = Point::new(0.0, obs.half + OUTSIDE_DEPTH);
            if obs.pos.distance(outside) <= ARRIVE {
                SweepState::Enter { target: inside }
            } else {
                state
            }
        }
        SweepState::Enter { target } => {
            if obs.pos.distance(target) <= ARRIVE {
                SweepState::Hunt
            } else {
                state
            }
        }
        SweepState::Hunt => match obs.closest_rat() {
            Some((_, dist)) if dist <= CATCH_RANGE => SweepState::Return,
            _ => state,
        },
        SweepState::Return => {
            if obs.pos.y >= obs.half + EXIT_DEPTH - ARRIVE {
                SweepState::Enter { target: inside }
            } else {
                state
            }
        }
    }
}

fn step_for(state: SweepState, obs: &Observation<'_>) -> Move {
    match state {
        SweepState::ToGate => {
            move_toward(obs.pos, Point::new(0.0, obs.half + OUTSIDE_DEPTH), false)
        }
        SweepState::Enter { target } => move_toward(obs.pos, target, false),
        SweepState::Hunt => match obs.closest_rat() {
            Some((rat, _)) => move_toward(obs.pos, rat, false),
            None => Move::ZERO,
        },
        SweepState::Return => {
            // line up under the gate first so the way out crosses it
            if obs.pos.y < obs.half - 2.0 * LINE_UP_DEPTH {
                move_toward(obs.pos, Point::new(0.0, obs.half - LINE_UP_DEPTH), true)
            } else {
                move_toward(obs.pos, Point::new(0.0, obs.half + EXIT_DEPTH), true)
            }
        }
    }
}

/// Advances one piper's plan and picks its local-frame move for this tick.
pub fn transition(state: SweepState, obs: &Observation<'_>) -> (SweepState, Move) {
    let next = next_state(state, obs);
    (next, step_for(next, obs))
}

/// Walks every piper in through its own gate, picks up the nearest rat and
/// plays it back out.
#[derive(Debug)]
pub struct Sweeper {
    team: Team,
    half: f64,
    states: Vec<SweepState>,
}

impl Default for Sweeper {
    fn default() -> Self {
        Self {
            team: Team::North,
            half: 0.0,
            states: Vec::new(),
        }
    }
}

impl Player for Sweeper {
    fn init(&mut self, init: PlayerInit<'_>) -> Result<(), AgentError> {
        if !init.arena_side.is_finite() || init.arena_side <= 0.0 {
            return Err(AgentError::new(format!(
                "unusable arena side {}",
                init.arena_side
            )));
        }
        self.team = init.team;
        self.half = init.arena_side * 0.5;
        self.states = vec![SweepState::ToGate; init.view.team_pipers(init.team).len()];
        Ok(())
    }

    fn play(&mut self, view: &ArenaView) -> Result<Vec<Move>, AgentError> {
        let team = self.team;
        let rats: Vec<Point> = view.rats.iter().map(|rat| to_local(team, *rat)).collect();
        let pipers = view.team_pipers(team);
        if pipers.len() != self.states.len() {
            return Err(AgentError::new(format!(
                "expected {} pipers, view has {}",
                self.states.len(),
                pipers.len()
            )));
        }

        let mut moves = Vec::with_capacity(pipers.len());
        for (idx, (state, pos)) in self.states.iter_mut().zip(pipers).enumerate() {
            let obs = Observation {
                pos: to_local(team, *pos),
                rats: &rats,
                half: self.half,
            };
            let (next, mv) = transition(*state, &obs);
            if next != *state {
                trace!(team = team.label(), piper = idx, ?next, "sweeper state changed");
            }
            *state = next;
            let step = to_world(team, Point::new(mv.dx, mv.dy));
            moves.push(Move::new(step.x, step.y, mv.play));
        }
        Ok(moves)
    }
}
