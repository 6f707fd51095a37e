use tracing::debug;

use crate::config::ArenaConfig;
use crate::constants::WALL_NUDGE;
use crate::geometry::{
    crossing_coordinate, mirror, reflect_off_horizontal, reflect_off_vertical, wall_at,
    within_gate, Axis,
};
use crate::types::{Boundary, Move, Point, RuntimeEvent, Team};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RatOutcome {
    Moved { dx: f64, dy: f64 },
    Captured { team: Team, x: f64, y: f64 },
}

fn gate_owner(axis: Axis, side: f64) -> Team {
    match (axis, side > 0.0) {
        (Axis::X, true) => Team::East,
        (Axis::X, false) => Team::West,
        (Axis::Y, true) => Team::North,
        (Axis::Y, false) => Team::South,
    }
}

fn crossing_point(axis: Axis, wall: f64, along: f64) -> (f64, f64) {
    match axis {
        Axis::X => (wall, along),
        Axis::Y => (along, wall),
    }
}

/// Resolves a rat's proposed displacement against the inner walls. Both axes
/// are tested against the same proposed endpoint; a gate crossing on either
/// captures the rat and stops all movement for the tick.
pub fn resolve_rat(
    config: &ArenaConfig,
    from: Point,
    dx: f64,
    dy: f64,
    angle: &mut f64,
    events: &mut Vec<RuntimeEvent>,
) -> RatOutcome {
    let half = config.inner_half();
    let to = from.offset(dx, dy);
    let mut step = [dx, dy];

    for (slot, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        let target = axis.of(to);
        if target.abs() <= half {
            continue;
        }
        let wall = wall_at(target, half);
        // a degenerate crossing falls through to the reflection
        if let Some(along) = crossing_coordinate(from, to, axis, wall) {
            if within_gate(along, config.gate_half_width()) {
                let (x, y) = crossing_point(axis, wall, along);
                return RatOutcome::Captured {
                    team: gate_owner(axis, target),
                    x,
                    y,
                };
            }
        }
        step[slot] = mirror(target, half) - axis.of(from);
        *angle = match axis {
            Axis::X => reflect_off_vertical(*angle),
            Axis::Y => reflect_off_horizontal(*angle),
        };
        debug!(wall = ?axis.wall(), "rat collided with wall");
        events.push(RuntimeEvent::RatBounced { wall: axis.wall() });
    }

    RatOutcome::Moved {
        dx: step[0],
        dy: step[1],
    }
}

/// Resolves a sanitized piper move against the outer grid wall (always solid)
/// and the inner walls (open at each gate). Returns the displacement to apply.
pub fn resolve_piper(
    config: &ArenaConfig,
    team: Team,
    piper: usize,
    from: Point,
    mv: Move,
    events: &mut Vec<RuntimeEvent>,
) -> (f64, f64) {
    let to = from.offset(mv.dx, mv.dy);
    let mut step = [mv.dx, mv.dy];
    for (slot, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        step[slot] = resolve_piper_axis(config, team, piper, from, to, axis, step[slot], events);
    }
    (step[0], step[1])
}

#[allow(clippy::too_many_arguments)]
fn resolve_piper_axis(
    config: &ArenaConfig,
    team: Team,
    piper: usize,
    from: Point,
    to: Point,
    axis: Axis,
    mut delta: f64,
    events: &mut Vec<RuntimeEvent>,
) -> f64 {
    let outer = config.outer_half();
    let inner = config.inner_half();
    let gate = config.gate_half_width();
    let start = axis.of(from);
    let target = axis.of(to);
    let wall_kind = axis.wall();

    if start.abs() <= outer && target.abs() > outer {
        delta = mirror(target, outer) - start;
        debug!(?team, piper, wall = ?wall_kind, "piper collided with grid wall");
        events.push(RuntimeEvent::PiperBlocked {
            team,
            piper,
            wall: wall_kind,
            boundary: Boundary::Outer,
            from_inside: true,
        });
    }

    // the inner walls act as full lines, so a piper in the outer margin is
    // held back too; `from_inside` still reports where it really was
    let outward = start.abs() <= inner && target.abs() > inner;
    let inward = start.abs() > inner && target.abs() <= inner;
    if !outward && !inward {
        return delta;
    }
    let from_inside = from.x.abs() <= inner && from.y.abs() <= inner;

    let wall = if outward {
        wall_at(target, inner)
    } else {
        wall_at(start, inner)
    };
    let crossing = crossing_coordinate(from, to, axis, wall);
    if let Some(along) = crossing.filter(|along| within_gate(*along, gate)) {
        let (x, y) = crossing_point(axis, wall, along);
        debug!(?team, piper, x, y, from_inside, "piper passed gate");
        events.push(RuntimeEvent::PiperPassedGate {
            team,
            piper,
            wall: wall_kind,
            from_inside,
            x,
            y,
        });
        return delta;
    }

    delta = mirror(target, inner) - start;
    if inward && start + delta == wall {
        delta *= WALL_NUDGE;
    }
    debug!(?team, piper, wall = ?wall_kind, from_inside, "piper collided with wall");
    events.push(RuntimeEvent::PiperBlocked {
        team,
        piper,
        wall: wall_kind,
        boundary: Boundary::Inner,
        from_inside,
    });
    delta
}
