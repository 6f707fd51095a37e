use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ATTRACTION_RADIUS, DEFAULT_GATE_LENGTH, DEFAULT_INNER_SIDE, DEFAULT_OUTER_MARGIN,
    DEFAULT_PIPERS_PER_TEAM, DEFAULT_RATS, PIPER_MUTE_SPEED, PIPER_PLAY_SPEED,
    PROXIMITY_THRESHOLD, RAT_SPEED,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid number of pipers: {0} (need at least 1)")]
    NoPipers(usize),

    #[error("invalid number of rats: {0} (need at least 1)")]
    NoRats(usize),

    #[error("invalid square side {side}: must exceed outer margin {margin}")]
    SideTooSmall { side: f64, margin: f64 },

    #[error("invalid gate length {gate}: must be positive and shorter than side {side}")]
    GateOutOfRange { gate: f64, side: f64 },

    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

/// Arena constants, fixed for the lifetime of a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    pub inner_side: f64,
    pub outer_margin: f64,
    pub gate_length: f64,
    pub rat_speed: f64,
    pub piper_mute_speed: f64,
    pub piper_play_speed: f64,
    pub attraction_radius: f64,
    pub proximity_threshold: f64,
    pub pipers_per_team: usize,
    pub rats: usize,
    /// Ticks to play; `None` plays until every rat is caught.
    pub turn_budget: Option<u64>,
    /// Abort the game when an agent fails instead of zeroing its moves.
    pub strict: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            inner_side: DEFAULT_INNER_SIDE,
            outer_margin: DEFAULT_OUTER_MARGIN,
            gate_length: DEFAULT_GATE_LENGTH,
            rat_speed: RAT_SPEED,
            piper_mute_speed: PIPER_MUTE_SPEED,
            piper_play_speed: PIPER_PLAY_SPEED,
            attraction_radius: ATTRACTION_RADIUS,
            proximity_threshold: PROXIMITY_THRESHOLD,
            pipers_per_team: DEFAULT_PIPERS_PER_TEAM,
            rats: DEFAULT_RATS,
            turn_budget: None,
            strict: false,
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipers_per_team == 0 {
            return Err(ConfigError::NoPipers(self.pipers_per_team));
        }
        if self.rats == 0 {
            return Err(ConfigError::NoRats(self.rats));
        }
        for (name, value) in [
            ("inner side", self.inner_side),
            ("outer margin", self.outer_margin),
            ("rat speed", self.rat_speed),
            ("piper mute speed", self.piper_mute_speed),
            ("piper play speed", self.piper_play_speed),
            ("attraction radius", self.attraction_radius),
            ("proximity threshold", self.proximity_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.inner_side <= self.outer_margin {
            return Err(ConfigError::SideTooSmall {
                side: self.inner_side,
                margin: self.outer_margin,
            });
        }
        if !self.gate_length.is_finite()
            || self.gate_length <= 0.0
            || self.gate_length >= self.inner_side
        {
            return Err(ConfigError::GateOutOfRange {
                gate: self.gate_length,
                side: self.inner_side,
            });
        }
        Ok(())
    }

    pub fn inner_half(&self) -> f64 {
        self.inner_side * 0.5
    }

    pub fn outer_half(&self) -> f64 {
        self.inner_half() + self.outer_margin
    }

    pub fn gate_half_width(&self) -> f64 {
        self.gate_length * 0.5
    }

    pub fn speed_limit(&self, play: bool) -> f64 {
        if play {
            self.piper_play_speed
        } else {
            self.piper_mute_speed
        }
    }

    /// Starting spots: evenly spaced along each team's outer edge.
    pub fn piper_start(&self, team_index: usize, piper: usize) -> (f64, f64) {
        let n = self.pipers_per_team as f64;
        let d = (piper as f64 + 1.0) * (self.inner_side / (n + 1.0)) - self.inner_half();
        let s = self.outer_half();
        match team_index {
            0 => (d, s),
            1 => (s, d),
            2 => (d, -s),
            _ => (-s, d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ArenaConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.inner_half(), 50.0);
        assert_eq!(config.outer_half(), 60.0);
        assert_eq!(config.gate_half_width(), 1.0);
        assert_eq!(config.speed_limit(true), 0.1);
        assert_eq!(config.speed_limit(false), 0.5);
    }

    #[test]
    fn rejects_empty_teams_and_rats() {
        let config = ArenaConfig {
            pipers_per_team: 0,
            ..ArenaConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPipers(0)));

        let config = ArenaConfig {
            rats: 0,
            ..ArenaConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoRats(0)));
    }

    #[test]
    fn rejects_side_not_exceeding_margin() {
        let config = ArenaConfig {
            inner_side: 10.0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SideTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_speeds_and_oversized_gates() {
        let config = ArenaConfig {
            rat_speed: f64::NAN,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                name: "rat speed",
                ..
            })
        ));

        let config = ArenaConfig {
            gate_length: 100.0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GateOutOfRange { .. })
        ));
    }

    #[test]
    fn piper_starts_are_symmetric() {
        let config = ArenaConfig::default();
        assert_eq!(config.piper_start(0, 0), (-50.0 + 100.0 / 3.0, 60.0));
        for piper in 0..config.pipers_per_team {
            let (nx, ny) = config.piper_start(0, piper);
            let (sx, sy) = config.piper_start(2, piper);
            let (ex, ey) = config.piper_start(1, piper);
            let (wx, wy) = config.piper_start(3, piper);
            assert_eq!((nx, -ny), (sx, sy));
            assert_eq!((ey, ex), (nx, ny));
            assert_eq!((-wx, wy), (ex, ey));
        }
    }
}
