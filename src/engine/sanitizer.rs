use crate::config::ArenaConfig;
use crate::types::Move;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sanitized {
    Accepted(Move),
    /// Over the speed limit; rescaled to exactly the limit.
    Clamped {
        mv: Move,
        length: f64,
    },
    /// Absent or non-finite; replaced by the zero move.
    Invalid,
}

impl Sanitized {
    pub fn into_move(self) -> Move {
        match self {
            Self::Accepted(mv) | Self::Clamped { mv, .. } => mv,
            Self::Invalid => Move::ZERO,
        }
    }
}

/// The only path from agent output to the physics: nothing reaches the
/// boundary resolver without passing through here.
pub fn sanitize_move(proposed: Option<Move>, config: &ArenaConfig) -> Sanitized {
    let Some(mv) = proposed else {
        return Sanitized::Invalid;
    };
    if !mv.is_finite() {
        return Sanitized::Invalid;
    }
    let length = mv.length();
    let limit = config.speed_limit(mv.play);
    if length > limit {
        // hypot overflows for components near f64::MAX; scale down first
        let largest = mv.dx.abs().max(mv.dy.abs());
        let (ux, uy) = (mv.dx / largest, mv.dy / largest);
        let norm = ux.hypot(uy);
        return Sanitized::Clamped {
            mv: Move::new(ux / norm * limit, uy / norm * limit, mv.play),
            length,
        };
    }
    Sanitized::Accepted(mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;

    #[test]
    fn non_finite_and_absent_moves_become_zero() {
        let config = ArenaConfig::default();
        for proposed in [
            None,
            Some(Move::new(f64::NAN, 0.0, true)),
            Some(Move::new(0.0, f64::INFINITY, false)),
            Some(Move::new(f64::NEG_INFINITY, f64::NAN, true)),
        ] {
            let sanitized = sanitize_move(proposed, &config);
            assert_eq!(sanitized, Sanitized::Invalid);
            let mv = sanitized.into_move();
            assert_eq!(mv.dx.to_bits(), 0.0f64.to_bits());
            assert_eq!(mv.dy.to_bits(), 0.0f64.to_bits());
            assert!(!mv.play);
        }
    }

    #[test]
    fn huge_finite_components_do_not_overflow_into_nan() {
        let config = ArenaConfig::default();
        let mv = sanitize_move(Some(Move::new(f64::MAX, f64::MAX, false)), &config).into_move();
        assert!(mv.is_finite());
        assert!((mv.length() - config.piper_mute_speed).abs() <= 1e-12);
        assert!((mv.dx - mv.dy).abs() <= 1e-15);
    }

    #[test]
    fn over_limit_moves_are_rescaled_to_the_limit() {
        let config = ArenaConfig::default();
        let sanitized = sanitize_move(Some(Move::new(3.0, 4.0, true)), &config);
        let Sanitized::Clamped { mv, length } = sanitized else {
            panic!("expected clamped move, got {sanitized:?}");
        };
        assert_eq!(length, 5.0);
        assert!(mv.play);
        assert!((mv.length() - config.piper_play_speed).abs() <= 1e-12);
        assert!((mv.dx / mv.dy - 0.75).abs() <= 1e-12);
    }

    #[test]
    fn moves_within_limit_pass_untouched() {
        let config = ArenaConfig::default();
        let mv = Move::new(0.3, -0.4, false);
        assert_eq!(sanitize_move(Some(mv), &config), Sanitized::Accepted(mv));
    }

    #[test]
    fn sanitized_length_never_exceeds_the_action_limit() {
        let config = ArenaConfig::default();
        for seed in 1..=2_000u32 {
            let mut rng = Rng::new(seed);
            let scale = 10f64.powi(rng.int(-3, 6) as i32);
            let play = rng.int(0, 1) == 1;
            let proposed = Move::new(
                (rng.next_f64() - 0.5) * scale,
                (rng.next_f64() - 0.5) * scale,
                play,
            );
            let mv = sanitize_move(Some(proposed), &config).into_move();
            assert_eq!(mv.play, play);
            assert!(mv.length() <= config.speed_limit(play) * (1.0 + 1e-12));
        }
    }
}
