use std::str::FromStr;

use glam::DVec2;
use rand::Rng;

use darts_core::board::BoardGeometry;
use darts_core::game_state::{HitError, HitResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    Empty,
    BadNumber(String),
    Invalid(HitError),
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "target is empty"),
            Self::BadNumber(s) => write!(f, "not a board number: {s:?}"),
            Self::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TargetError {}

/// A zone to aim at, written `T20`, `D16`, `S5`, `7`, `BULL` or `DBULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target(pub HitResult);

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        match s.as_str() {
            "" => return Err(TargetError::Empty),
            "BULL" | "SBULL" => return Ok(Self(HitResult::SINGLE_BULL)),
            "DBULL" => return Ok(Self(HitResult::DOUBLE_BULL)),
            _ => {},
        }
        let (factor, digits) = if let Some(rest) = s.strip_prefix('S') {
            (1, rest)
        } else if let Some(rest) = s.strip_prefix('D') {
            (2, rest)
        } else if let Some(rest) = s.strip_prefix('T') {
            (3, rest)
        } else {
            (1, s.as_str())
        };
        let score: u8 = digits
            .parse()
            .map_err(|_| TargetError::BadNumber(digits.to_string()))?;
        HitResult::new(score, factor)
            .map(Self)
            .map_err(TargetError::Invalid)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Picks throw points: the chosen target's aim point plus uniform jitter
/// in a disc.
#[derive(Debug, Clone)]
pub struct Aimer {
    preferred: Target,
    jitter: f64,
}

impl Aimer {
    pub fn new(preferred: Target, jitter: f64) -> Self {
        Self {
            preferred,
            jitter: jitter.max(0.0),
        }
    }

    pub fn preferred(&self) -> Target {
        self.preferred
    }

    /// Where to throw for a player on `score` (unknown when `None`).
    pub fn pick(&self, score: Option<i32>, geometry: &BoardGeometry, rng: &mut impl Rng) -> DVec2 {
        let aim = geometry.aim_point(choose_target(score, self.preferred).0);
        if self.jitter == 0.0 {
            return aim;
        }
        let angle = rng.random_range(0.0..std::f64::consts::TAU);
        // sqrt keeps the density uniform over the disc.
        let radius = self.jitter * rng.random::<f64>().sqrt();
        aim + DVec2::new(angle.cos(), angle.sin()) * radius
    }
}

/// Target for a player on `score`: a double that finishes when one exists,
/// a single that leaves a finishing double when close, else `preferred`.
///
/// Games must finish on a double and a remainder of 1 is a bust.
pub fn choose_target(score: Option<i32>, preferred: Target) -> Target {
    let single = |n: i32| HitResult::new(n as u8, 1).map_or(preferred, Target);
    match score {
        Some(50) => Target(HitResult::DOUBLE_BULL),
        Some(s @ 2..=40) if s % 2 == 0 => {
            HitResult::new((s / 2) as u8, 2).map_or(preferred, Target)
        },
        Some(3..=39) => single(1),
        Some(s @ 41..=60) => single(s - 40),
        _ => preferred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darts_core::board;
    use darts_core::game_state::Multiplier;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parses_targets() {
        let t: Target = "t20".parse().unwrap();
        assert_eq!((t.0.score(), t.0.multiplier()), (20, Multiplier::Triple));
        let t: Target = "D16".parse().unwrap();
        assert_eq!((t.0.score(), t.0.multiplier()), (16, Multiplier::Double));
        let t: Target = "7".parse().unwrap();
        assert_eq!((t.0.score(), t.0.multiplier()), (7, Multiplier::Single));
        assert_eq!("bull".parse::<Target>().unwrap().0, HitResult::SINGLE_BULL);
        assert_eq!("DBULL".parse::<Target>().unwrap().0, HitResult::DOUBLE_BULL);
    }

    #[test]
    fn rejects_bad_targets() {
        assert_eq!("".parse::<Target>(), Err(TargetError::Empty));
        assert!(matches!("Tx".parse::<Target>(), Err(TargetError::BadNumber(_))));
        assert!(matches!("21".parse::<Target>(), Err(TargetError::Invalid(_))));
        assert!(matches!("T25".parse::<Target>(), Err(TargetError::Invalid(_))));
    }

    #[test]
    fn zero_jitter_hits_the_target() {
        let geometry = BoardGeometry::default();
        let aimer = Aimer::new("T19".parse().unwrap(), 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        let point = aimer.pick(None, &geometry, &mut rng);
        assert_eq!(board::map(point, &geometry), Some(aimer.preferred().0));
        let point = aimer.pick(Some(40), &geometry, &mut rng);
        assert_eq!(board::map(point, &geometry), HitResult::new(20, 2).ok());
    }

    #[test]
    fn jitter_stays_in_the_disc() {
        let geometry = BoardGeometry::default();
        let aimer = Aimer::new("T20".parse().unwrap(), 12.0);
        let aim = geometry.aim_point(aimer.preferred().0);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let point = aimer.pick(Some(301), &geometry, &mut rng);
            assert!(point.distance(aim) <= 12.0 + 1e-9);
        }
    }

    #[test]
    fn finishes_on_a_double() {
        let preferred: Target = "T20".parse().unwrap();
        assert_eq!(choose_target(Some(50), preferred).0, HitResult::DOUBLE_BULL);
        let t = choose_target(Some(32), preferred).0;
        assert_eq!((t.score(), t.multiplier()), (16, Multiplier::Double));
        let t = choose_target(Some(2), preferred).0;
        assert_eq!((t.score(), t.multiplier()), (1, Multiplier::Double));
        // Odd remainders set up an even one.
        let t = choose_target(Some(9), preferred).0;
        assert_eq!((t.score(), t.multiplier()), (1, Multiplier::Single));
        let t = choose_target(Some(57), preferred).0;
        assert_eq!((t.score(), t.multiplier()), (17, Multiplier::Single));
        assert_eq!(choose_target(Some(501), preferred), preferred);
        assert_eq!(choose_target(None, preferred), preferred);
    }
}
