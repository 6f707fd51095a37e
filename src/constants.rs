pub const TEAM_COUNT: usize = 4;

pub const DEFAULT_INNER_SIDE: f64 = 100.0;
pub const DEFAULT_OUTER_MARGIN: f64 = 10.0;
pub const DEFAULT_GATE_LENGTH: f64 = 2.0;

pub const RAT_SPEED: f64 = 0.1;
pub const PIPER_MUTE_SPEED: f64 = 0.5;
pub const PIPER_PLAY_SPEED: f64 = 0.1;

pub const ATTRACTION_RADIUS: f64 = 10.0;
pub const PROXIMITY_THRESHOLD: f64 = 2.0;

pub const DEFAULT_PIPERS_PER_TEAM: usize = 2;
pub const DEFAULT_RATS: usize = 10;

/// Ticks per command-line "turn".
pub const TICKS_PER_TURN: u64 = 10;

/// Segments whose extent along the crossed axis is below this are treated as
/// having no usable crossing point.
pub const DEGENERATE_DELTA: f64 = 1e-12;

/// Scale applied to an inward piper step that would land exactly on the
/// inner wall.
pub const WALL_NUDGE: f64 = 0.999_999;

pub const DEFAULT_FPS: f64 = 50.0;

/// Hard stop for games without a turn budget whose agents never finish.
pub const UNBOUNDED_TICK_SAFETY: u64 = 10_000_000;

pub const DEFAULT_TRIALS: u32 = 5;
/// Odd multiplier spreading consecutive game indices over the seed space.
pub const SEED_STRIDE: u32 = 0x9E37_79B9;

pub fn ticks_for_turns(turns: u64) -> u64 {
    turns.saturating_mul(TICKS_PER_TURN)
}

pub fn frame_interval_ms(fps: f64) -> Option<u64> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    Some((1000.0 / fps).round().max(1.0) as u64)
}
