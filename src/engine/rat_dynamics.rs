use crate::config::ArenaConfig;
use crate::geometry::normalize_angle;
use crate::rng::Rng;
use crate::types::{Point, Team};

use super::Rat;

/// Team with strictly the most playing pipers within `radius` of `rat`.
/// A tie at the top, including the all-zero case, has no winner.
pub fn dominant_team(rat: Point, signaling: &[Vec<Point>], radius: f64) -> Option<Team> {
    let mut best = 0usize;
    let mut winner = None;
    let mut tied = false;
    for (index, pipers) in signaling.iter().enumerate() {
        let count = pipers
            .iter()
            .filter(|piper| rat.distance(**piper) <= radius)
            .count();
        if count > best {
            best = count;
            winner = Team::from_index(index);
            tied = false;
        } else if count == best && count > 0 {
            tied = true;
        }
    }
    if tied {
        None
    } else {
        winner
    }
}

fn closest(rat: Point, pipers: &[Point]) -> Option<Point> {
    let mut best: Option<(Point, f64)> = None;
    for &piper in pipers {
        let d = rat.distance(piper);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((piper, d));
        }
    }
    best.map(|(piper, _)| piper)
}

/// Updates the rat's tune, heading and reroll flag for this tick and returns
/// the displacement it wants before walls are considered.
pub fn propose_displacement(
    rat: &mut Rat,
    signaling: &[Vec<Point>],
    config: &ArenaConfig,
    rng: &mut Rng,
) -> (f64, f64) {
    let tune = dominant_team(rat.pos, signaling, config.attraction_radius);
    rat.tune = tune;

    let target = tune.and_then(|team| closest(rat.pos, &signaling[team.index()]));
    let Some(target) = target else {
        if rat.reroll_heading {
            rat.reroll_heading = false;
            rat.angle = rng.angle();
        }
        return (
            config.rat_speed * rat.angle.cos(),
            config.rat_speed * rat.angle.sin(),
        );
    };

    // the next unattracted tick starts from a fresh heading
    rat.reroll_heading = true;

    let (tx, ty) = (target.x - rat.pos.x, target.y - rat.pos.y);
    let dist = rat.pos.distance(target);
    if dist > 0.0 {
        rat.angle = normalize_angle(ty.atan2(tx));
    }
    if dist >= config.proximity_threshold {
        (tx * config.rat_speed / dist, ty * config.rat_speed / dist)
    } else {
        (0.0, 0.0)
    }
}
