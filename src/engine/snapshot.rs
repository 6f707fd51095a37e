use crate::types::{Point, PiperTelemetry, RatTelemetry, Team, TeamTelemetry};

use super::{Piper, Rat};

/// Read-only copy of the arena handed to agents each tick.
///
/// Buffers are reused between ticks but every slot is overwritten on
/// [`ArenaView::refresh`], so nothing from an earlier tick survives.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArenaView {
    /// Piper positions indexed by team, then piper.
    pub pipers: Vec<Vec<Point>>,
    /// Whether each piper played on the previous tick.
    pub playing: Vec<Vec<bool>>,
    pub rats: Vec<Point>,
}

impl ArenaView {
    pub fn refresh(&mut self, pipers: &[Vec<Piper>], rats: &[Rat]) {
        self.pipers.resize_with(pipers.len(), Vec::new);
        self.playing.resize_with(pipers.len(), Vec::new);
        for (team_idx, team) in pipers.iter().enumerate() {
            let positions = &mut self.pipers[team_idx];
            positions.clear();
            positions.extend(team.iter().map(|piper| piper.pos));
            let playing = &mut self.playing[team_idx];
            playing.clear();
            playing.extend(team.iter().map(|piper| piper.last_move.play));
        }
        self.rats.clear();
        self.rats.extend(rats.iter().map(|rat| rat.pos));
    }

    pub fn team_pipers(&self, team: Team) -> &[Point] {
        self.pipers
            .get(team.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub(super) fn team_telemetry(
    team: Team,
    group: &str,
    score: u32,
    pipers: &[Piper],
    scale: f64,
) -> TeamTelemetry {
    TeamTelemetry {
        team,
        group: group.to_string(),
        score,
        pipers: pipers
            .iter()
            .map(|piper| PiperTelemetry {
                x: piper.pos.x / scale,
                y: piper.pos.y / scale,
                playing: piper.last_move.play,
            })
            .collect(),
    }
}

pub(super) fn rat_telemetry(rats: &[Rat], scale: f64) -> Vec<RatTelemetry> {
    rats.iter()
        .map(|rat| RatTelemetry {
            x: rat.pos.x / scale,
            y: rat.pos.y / scale,
            angle: rat.angle,
            tune: rat.tune,
        })
        .collect()
}
