//! Contract between the referee and a team's decision logic.
//!
//! The engine treats every implementation as untrusted: it only ever sees a
//! read-only [`ArenaView`], its output is sanitized before it touches the
//! physics, and both `Err` returns and panics are contained per team.

use thiserror::Error;

use crate::engine::ArenaView;
use crate::types::{Move, Team};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AgentError(pub String);

impl AgentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub struct PlayerInit<'a> {
    pub team: Team,
    pub arena_side: f64,
    pub turn_budget: Option<u64>,
    pub view: &'a ArenaView,
}

pub trait Player: Send {
    /// Called once before the first tick.
    fn init(&mut self, init: PlayerInit<'_>) -> Result<(), AgentError>;

    /// One displacement per owned piper, in piper order. Missing entries are
    /// treated as invalid and extra entries are ignored.
    fn play(&mut self, view: &ArenaView) -> Result<Vec<Move>, AgentError>;
}
