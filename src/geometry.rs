use std::f64::consts::{PI, TAU};

use crate::constants::DEGENERATE_DELTA;
use crate::types::{Point, Wall};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn of(self, point: Point) -> f64 {
        match self {
            Self::X => point.x,
            Self::Y => point.y,
        }
    }

    pub fn other(self) -> Axis {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }

    /// The wall perpendicular to this axis.
    pub fn wall(self) -> Wall {
        match self {
            Self::X => Wall::Vertical,
            Self::Y => Wall::Horizontal,
        }
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Where the segment `from -> to` meets the line `axis == boundary`, expressed
/// as the coordinate on the other axis. `None` when the segment has no usable
/// extent along `axis`.
pub fn crossing_coordinate(from: Point, to: Point, axis: Axis, boundary: f64) -> Option<f64> {
    let delta = axis.of(to) - axis.of(from);
    if !delta.is_finite() || delta.abs() < DEGENERATE_DELTA {
        return None;
    }
    let other = axis.other();
    let along = axis.of(from);
    let crossing = other.of(from) + (boundary - along) * (other.of(to) - other.of(from)) / delta;
    crossing.is_finite().then_some(crossing)
}

/// Closed interval: a crossing exactly on the gate edge counts as inside.
pub fn within_gate(coordinate: f64, half_width: f64) -> bool {
    coordinate >= -half_width && coordinate <= half_width
}

/// Wall line on the side `value` lies on.
pub fn wall_at(value: f64, half: f64) -> f64 {
    half.copysign(value)
}

/// Mirror `value` across the wall at `±half`, keeping its sign.
pub fn mirror(value: f64, half: f64) -> f64 {
    (2.0 * half - value.abs()).copysign(value)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

pub fn reflect_off_vertical(angle: f64) -> f64 {
    normalize_angle(PI - angle)
}

pub fn reflect_off_horizontal(angle: f64) -> f64 {
    normalize_angle(TAU - angle)
}
