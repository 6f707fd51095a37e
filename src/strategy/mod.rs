use crate::constants::{PIPER_MUTE_SPEED, PIPER_PLAY_SPEED};
use crate::engine::ArenaView;
use crate::player::{AgentError, Player, PlayerInit};
use crate::types::{Move, Point, Team};

mod sweeper;

pub use self::sweeper::{transition, Observation, SweepState, Sweeper};

pub const STRATEGY_NAMES: [&str; 2] = ["idle", "sweeper"];

pub fn by_name(name: &str) -> Option<Box<dyn Player>> {
    match name {
        "idle" => Some(Box::new(Idle::default())),
        "sweeper" => Some(Box::new(Sweeper::default())),
        _ => None,
    }
}

/// Step from `src` toward `dst`, shortened to the speed limit for `play`.
pub fn move_toward(src: Point, dst: Point, play: bool) -> Move {
    let mut dx = dst.x - src.x;
    let mut dy = dst.y - src.y;
    let length = dx.hypot(dy);
    let limit = if play {
        PIPER_PLAY_SPEED
    } else {
        PIPER_MUTE_SPEED
    };
    if length > limit {
        dx = dx * limit / length;
        dy = dy * limit / length;
    }
    Move::new(dx, dy, play)
}

/// Never moves, never plays.
#[derive(Debug, Default)]
pub struct Idle {
    pipers: usize,
}

impl Player for Idle {
    fn init(&mut self, init: PlayerInit<'_>) -> Result<(), AgentError> {
        self.pipers = init.view.team_pipers(init.team).len();
        Ok(())
    }

    fn play(&mut self, _view: &ArenaView) -> Result<Vec<Move>, AgentError> {
        Ok(vec![Move::ZERO; self.pipers])
    }
}

/// Rotation taking world coordinates into a frame where `team`'s gate sits
/// on the positive y axis. Exact for every team.
pub fn to_local(team: Team, p: Point) -> Point {
    match team {
        Team::North => p,
        Team::East => Point::new(-p.y, p.x),
        Team::South => Point::new(-p.x, -p.y),
        Team::West => Point::new(p.y, -p.x),
    }
}

pub fn to_world(team: Team, p: Point) -> Point {
    match team {
        Team::North => p,
        Team::East => Point::new(p.y, -p.x),
        Team::South => Point::new(-p.x, -p.y),
        Team::West => Point::new(-p.y, p.x),
    }
}
