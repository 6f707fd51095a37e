use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    North,
    East,
    South,
    West,
}

impl Team {
    pub const ALL: [Team; 4] = [Team::North, Team::East, Team::South, Team::West];

    pub fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    /// Center of this team's gate on an inner wall at distance `half`.
    pub fn gate(self, half: f64) -> Point {
        match self {
            Self::North => Point::new(0.0, half),
            Self::East => Point::new(half, 0.0),
            Self::South => Point::new(0.0, -half),
            Self::West => Point::new(-half, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// A displacement for one tick, plus whether the actor plays while moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub dx: f64,
    pub dy: f64,
    pub play: bool,
}

impl Move {
    pub const ZERO: Move = Move {
        dx: 0.0,
        dy: 0.0,
        play: false,
    };

    pub const fn new(dx: f64, dy: f64, play: bool) -> Self {
        Self { dx, dy, play }
    }

    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wall {
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Inner,
    Outer,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    InvalidMove {
        team: Team,
        piper: usize,
    },
    MoveClamped {
        team: Team,
        piper: usize,
        length: f64,
    },
    AgentFailure {
        team: Team,
        reason: String,
    },
    RatCaptured {
        team: Team,
        x: f64,
        y: f64,
    },
    RatBounced {
        wall: Wall,
    },
    PiperBlocked {
        team: Team,
        piper: usize,
        wall: Wall,
        boundary: Boundary,
        #[serde(rename = "fromInside")]
        from_inside: bool,
    },
    PiperPassedGate {
        team: Team,
        piper: usize,
        wall: Wall,
        #[serde(rename = "fromInside")]
        from_inside: bool,
        x: f64,
        y: f64,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct PiperTelemetry {
    pub x: f64,
    pub y: f64,
    pub playing: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct TeamTelemetry {
    pub team: Team,
    pub group: String,
    pub score: u32,
    pub pipers: Vec<PiperTelemetry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RatTelemetry {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub tune: Option<Team>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TelemetryFrame {
    pub tick: u64,
    #[serde(rename = "turnsLeft")]
    pub turns_left: Option<u64>,
    #[serde(rename = "sideRatio")]
    pub side_ratio: f64,
    pub ended: bool,
    pub teams: Vec<TeamTelemetry>,
    pub rats: Vec<RatTelemetry>,
    pub events: Vec<RuntimeEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_index_round_trips() {
        for team in Team::ALL {
            assert_eq!(Team::from_index(team.index()), Some(team));
        }
        assert_eq!(Team::from_index(4), None);
    }

    #[test]
    fn gates_sit_on_their_own_side() {
        assert_eq!(Team::North.gate(50.0), Point::new(0.0, 50.0));
        assert_eq!(Team::East.gate(50.0), Point::new(50.0, 0.0));
        assert_eq!(Team::South.gate(50.0), Point::new(0.0, -50.0));
        assert_eq!(Team::West.gate(50.0), Point::new(-50.0, 0.0));
    }

    #[test]
    fn runtime_event_serializes_with_type_tag() {
        let value = serde_json::to_value(RuntimeEvent::RatCaptured {
            team: Team::South,
            x: 0.5,
            y: -50.0,
        })
        .expect("event should serialize");
        assert_eq!(value["type"], "rat_captured");
        assert_eq!(value["team"], "south");
    }
}
