use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::game_state::{HitResult, Multiplier};

/// Number of numbered sectors on the board.
pub const SECTOR_COUNT: usize = 20;

/// Angular width of one sector in degrees.
pub const SECTOR_DEGREES: f64 = 360.0 / SECTOR_COUNT as f64;

/// Sector boundaries sit half a sector either side of each printed number.
const HALF_SECTOR_DEGREES: f64 = SECTOR_DEGREES / 2.0;

/// Standard face numbers, clockwise from 12 o'clock.
pub const STANDARD_NUMBERS: [u8; SECTOR_COUNT] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

/// Logical drawing resolution of the board canvas (square).
pub const LOGICAL_BOARD_SIZE: f64 = 500.0;

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    NonPositiveRadius(f64),
    RadiiNotIncreasing { index: usize },
    NumberOutOfRange(u8),
    DuplicateNumber(u8),
    NonFiniteCenter,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveRadius(r) => write!(f, "radius must be positive, got {r}"),
            Self::RadiiNotIncreasing { index } => {
                write!(f, "ring radius at index {index} is not larger than the one before it")
            },
            Self::NumberOutOfRange(n) => write!(f, "face number {n} is outside 1..=20"),
            Self::DuplicateNumber(n) => write!(f, "face number {n} appears more than once"),
            Self::NonFiniteCenter => write!(f, "board center must be finite"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Ring boundaries in board pixels, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingRadii {
    pub bullseye: f64,
    pub bull: f64,
    pub inner_single: f64,
    pub triple: f64,
    pub outer_single: f64,
    pub double: f64,
}

impl RingRadii {
    pub const STANDARD: RingRadii = RingRadii {
        bullseye: 15.0,
        bull: 40.0,
        inner_single: 100.0,
        triple: 115.0,
        outer_single: 170.0,
        double: 185.0,
    };

    fn as_array(&self) -> [f64; 6] {
        [
            self.bullseye,
            self.bull,
            self.inner_single,
            self.triple,
            self.outer_single,
            self.double,
        ]
    }
}

impl Default for RingRadii {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Scoring zone a distance from the center falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ring {
    DoubleBull,
    SingleBull,
    InnerSingle,
    Triple,
    OuterSingle,
    Double,
}

impl Ring {
    pub fn multiplier(self) -> Multiplier {
        match self {
            Self::DoubleBull | Self::Double => Multiplier::Double,
            Self::Triple => Multiplier::Triple,
            Self::SingleBull | Self::InnerSingle | Self::OuterSingle => Multiplier::Single,
        }
    }
}

/// Immutable board layout: center, ring radii and the clockwise number sequence.
///
/// Construction validates that radii are strictly increasing and that the
/// numbers are a permutation of 1..=20, so lookups never fail afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardGeometry {
    center: DVec2,
    radii: RingRadii,
    numbers: [u8; SECTOR_COUNT],
}

impl BoardGeometry {
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(
        center: DVec2,
        radii: RingRadii,
        numbers: [u8; SECTOR_COUNT],
    ) -> Result<Self, GeometryError> {
        if !center.is_finite() {
            return Err(GeometryError::NonFiniteCenter);
        }
        let rings = radii.as_array();
        if !(rings[0] > 0.0) {
            return Err(GeometryError::NonPositiveRadius(rings[0]));
        }
        for index in 1..rings.len() {
            // Written negated so NaN fails too.
            if !(rings[index] > rings[index - 1]) {
                return Err(GeometryError::RadiiNotIncreasing { index });
            }
        }
        let mut seen = [false; SECTOR_COUNT + 1];
        for &n in &numbers {
            if n == 0 || n as usize > SECTOR_COUNT {
                return Err(GeometryError::NumberOutOfRange(n));
            }
            if seen[n as usize] {
                return Err(GeometryError::DuplicateNumber(n));
            }
            seen[n as usize] = true;
        }
        Ok(Self {
            center,
            radii,
            numbers,
        })
    }

    /// Standard board centered at `center`.
    pub fn standard(center: DVec2) -> Self {
        Self {
            center,
            radii: RingRadii::STANDARD,
            numbers: STANDARD_NUMBERS,
        }
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn radii(&self) -> &RingRadii {
        &self.radii
    }

    pub fn numbers(&self) -> &[u8; SECTOR_COUNT] {
        &self.numbers
    }

    /// Ring at `distance` from the center, or `None` outside the double ring.
    ///
    /// Bull zones are closed discs. Every other band is `inner <= d < outer`,
    /// except the double ring whose outer edge is also closed.
    pub fn ring_at(&self, distance: f64) -> Option<Ring> {
        let r = &self.radii;
        if !distance.is_finite() || distance > r.double {
            return None;
        }
        let ring = if distance <= r.bullseye {
            Ring::DoubleBull
        } else if distance <= r.bull {
            Ring::SingleBull
        } else if distance < r.inner_single {
            Ring::InnerSingle
        } else if distance < r.triple {
            Ring::Triple
        } else if distance < r.outer_single {
            Ring::OuterSingle
        } else {
            Ring::Double
        };
        Some(ring)
    }

    /// Face number for the sector containing `angle_deg` (clockwise from top).
    pub fn number_at_angle(&self, angle_deg: f64) -> u8 {
        self.numbers[sector_index(angle_deg)]
    }

    pub fn contains(&self, point: DVec2) -> bool {
        point.distance(self.center) <= self.radii.double
    }

    /// Middle of the zone that scores `hit`; [`map`] of the result is `hit`.
    ///
    /// Singles aim at the outer single band, the wider of the two.
    pub fn aim_point(&self, hit: HitResult) -> DVec2 {
        let r = &self.radii;
        let distance = match (hit.is_bull(), hit.multiplier()) {
            (true, Multiplier::Double) => return self.center,
            (true, _) => (r.bullseye + r.bull) / 2.0,
            (false, Multiplier::Single) => (r.triple + r.outer_single) / 2.0,
            (false, Multiplier::Triple) => (r.inner_single + r.triple) / 2.0,
            (false, Multiplier::Double) => (r.outer_single + r.double) / 2.0,
        };
        let sector = if hit.is_bull() {
            0
        } else {
            self.numbers
                .iter()
                .position(|&n| n == hit.score())
                .unwrap_or_default()
        };
        let angle = (sector as f64 * SECTOR_DEGREES).to_radians();
        self.center + DVec2::new(angle.sin(), -angle.cos()) * distance
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self::standard(DVec2::splat(LOGICAL_BOARD_SIZE / 2.0))
    }
}

/// Clockwise angle of `offset` measured from 12 o'clock, in `[0, 360)`.
///
/// Screen coordinates grow downwards, so "up" is negative y.
pub fn clockwise_angle_from_top(offset: DVec2) -> f64 {
    let angle = offset.x.atan2(-offset.y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360.
    if angle >= 360.0 { 0.0 } else { angle }
}

/// Sector index 0..20 for a clockwise angle from the top.
///
/// Each sector covers `[start, start + 18)` after shifting by half a sector,
/// so a boundary angle always belongs to the sector clockwise of it.
pub fn sector_index(angle_deg: f64) -> usize {
    let shifted = (angle_deg + HALF_SECTOR_DEGREES).rem_euclid(360.0);
    let index = (shifted / SECTOR_DEGREES).floor();
    if index.is_finite() && index >= 0.0 {
        (index as usize).min(SECTOR_COUNT - 1)
    } else {
        0
    }
}

/// Map a board-local point to the dart it scores, or `None` for a miss.
pub fn map(point: DVec2, geometry: &BoardGeometry) -> Option<HitResult> {
    let offset = point - geometry.center;
    let ring = geometry.ring_at(offset.length())?;
    let hit = match ring {
        Ring::DoubleBull => HitResult::DOUBLE_BULL,
        Ring::SingleBull => HitResult::SINGLE_BULL,
        _ => {
            let number = geometry.number_at_angle(clockwise_angle_from_top(offset));
            HitResult::numbered(number, ring.multiplier())
        },
    };
    Some(hit)
}

/// On-screen rectangle the board canvas is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a viewport click into board-local coordinates.
///
/// `logical` is the canvas drawing resolution; the scale factor is the
/// logical size over the rendered size on each axis. Returns `None` for a
/// degenerate viewport.
pub fn viewport_to_board(client: DVec2, viewport: &Viewport, logical: DVec2) -> Option<DVec2> {
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return None;
    }
    let scale = DVec2::new(logical.x / viewport.width, logical.y / viewport.height);
    let local = (client - DVec2::new(viewport.left, viewport.top)) * scale;
    local.is_finite().then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardGeometry {
        BoardGeometry::default()
    }

    /// Point at `distance` from the center along the middle of `sector`.
    fn polar(geometry: &BoardGeometry, sector: usize, distance: f64) -> DVec2 {
        let angle = (sector as f64 * SECTOR_DEGREES).to_radians();
        geometry.center() + DVec2::new(angle.sin(), -angle.cos()) * distance
    }

    #[test]
    fn bullseye_is_double_bull() {
        let b = board();
        let hit = map(b.center() + DVec2::new(10.0, 0.0), &b).unwrap();
        assert_eq!(hit, HitResult::DOUBLE_BULL);
        assert_eq!((hit.score(), hit.multiplier().factor()), (25, 2));
    }

    #[test]
    fn dead_center_is_double_bull() {
        let b = board();
        assert_eq!(map(b.center(), &b), Some(HitResult::DOUBLE_BULL));
    }

    #[test]
    fn bull_ring_is_single_bull() {
        let b = board();
        assert_eq!(
            map(b.center() + DVec2::new(0.0, 30.0), &b),
            Some(HitResult::SINGLE_BULL)
        );
        // Closed outer edge
        assert_eq!(
            map(b.center() + DVec2::new(40.0, 0.0), &b),
            Some(HitResult::SINGLE_BULL)
        );
    }

    #[test]
    fn outer_single_at_top_is_twenty() {
        let b = board();
        let hit = map(b.center() + DVec2::new(0.0, -150.0), &b).unwrap();
        assert_eq!(hit.score(), 20);
        assert_eq!(hit.multiplier(), Multiplier::Single);
    }

    #[test]
    fn rings_by_distance() {
        let b = board();
        let cases = [
            (70.0, Multiplier::Single),
            (100.0, Multiplier::Triple),
            (110.0, Multiplier::Triple),
            (115.0, Multiplier::Single),
            (169.9, Multiplier::Single),
            (170.0, Multiplier::Double),
            (185.0, Multiplier::Double),
        ];
        for (distance, expected) in cases {
            let hit = map(polar(&b, 0, distance), &b).unwrap();
            assert_eq!(hit.multiplier(), expected, "distance {distance}");
            assert_eq!(hit.score(), 20, "distance {distance}");
        }
    }

    #[test]
    fn outside_double_ring_misses() {
        let b = board();
        assert_eq!(map(polar(&b, 5, 185.01), &b), None);
        assert_eq!(map(DVec2::new(0.0, 0.0), &b), None);
    }

    #[test]
    fn non_finite_point_misses() {
        let b = board();
        assert_eq!(map(DVec2::new(f64::NAN, 10.0), &b), None);
        assert_eq!(map(DVec2::new(f64::INFINITY, 10.0), &b), None);
    }

    #[test]
    fn every_sector_maps_to_its_number() {
        let b = board();
        for (sector, &number) in STANDARD_NUMBERS.iter().enumerate() {
            let hit = map(polar(&b, sector, 140.0), &b).unwrap();
            assert_eq!(hit.score(), number, "sector {sector}");
        }
    }

    #[test]
    fn cardinal_directions() {
        let b = board();
        let c = b.center();
        assert_eq!(map(c + DVec2::new(150.0, 0.0), &b).unwrap().score(), 6);
        assert_eq!(map(c + DVec2::new(0.0, 150.0), &b).unwrap().score(), 3);
        assert_eq!(map(c + DVec2::new(-150.0, 0.0), &b).unwrap().score(), 11);
    }

    #[test]
    fn triple_twenty() {
        let b = board();
        let hit = map(b.center() + DVec2::new(0.0, -107.0), &b).unwrap();
        assert_eq!(hit.score(), 20);
        assert_eq!(hit.multiplier(), Multiplier::Triple);
        assert_eq!(hit.value(), 60);
    }

    #[test]
    fn sector_boundary_belongs_to_clockwise_sector() {
        // 9 degrees is the boundary between 20 (index 0) and 1 (index 1).
        assert_eq!(sector_index(9.0), 1);
        assert_eq!(sector_index(8.999), 0);
        // 351 degrees is the boundary between 5 (index 19) and 20 (index 0).
        assert_eq!(sector_index(351.0), 0);
        assert_eq!(sector_index(350.999), 19);
    }

    #[test]
    fn angle_from_top_is_clockwise() {
        assert_eq!(clockwise_angle_from_top(DVec2::new(0.0, -1.0)), 0.0);
        assert!((clockwise_angle_from_top(DVec2::new(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((clockwise_angle_from_top(DVec2::new(0.0, 1.0)) - 180.0).abs() < 1e-9);
        assert!((clockwise_angle_from_top(DVec2::new(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn standard_geometry_is_valid() {
        let b = board();
        let rebuilt = BoardGeometry::new(b.center(), *b.radii(), *b.numbers()).unwrap();
        assert_eq!(rebuilt, b);
    }

    #[test]
    fn rejects_non_increasing_radii() {
        let radii = RingRadii {
            triple: 100.0,
            ..RingRadii::STANDARD
        };
        assert_eq!(
            BoardGeometry::new(DVec2::ZERO, radii, STANDARD_NUMBERS),
            Err(GeometryError::RadiiNotIncreasing { index: 3 })
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut numbers = STANDARD_NUMBERS;
        numbers[3] = 20;
        assert_eq!(
            BoardGeometry::new(DVec2::ZERO, RingRadii::STANDARD, numbers),
            Err(GeometryError::DuplicateNumber(20))
        );
        numbers[3] = 21;
        assert_eq!(
            BoardGeometry::new(DVec2::ZERO, RingRadii::STANDARD, numbers),
            Err(GeometryError::NumberOutOfRange(21))
        );
    }

    #[test]
    fn rejects_nan_radius() {
        let radii = RingRadii {
            bullseye: f64::NAN,
            ..RingRadii::STANDARD
        };
        assert!(BoardGeometry::new(DVec2::ZERO, radii, STANDARD_NUMBERS).is_err());
    }

    #[test]
    fn viewport_scaling_doubles_half_size_canvas() {
        let viewport = Viewport {
            left: 10.0,
            top: 20.0,
            width: 250.0,
            height: 250.0,
        };
        let local = viewport_to_board(
            DVec2::new(135.0, 145.0),
            &viewport,
            DVec2::splat(LOGICAL_BOARD_SIZE),
        )
        .unwrap();
        assert_eq!(local, DVec2::new(250.0, 250.0));
    }

    #[test]
    fn viewport_scaling_rejects_empty_rect() {
        let viewport = Viewport {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 100.0,
        };
        assert!(viewport_to_board(DVec2::ZERO, &viewport, DVec2::splat(500.0)).is_none());
    }

    #[test]
    fn aim_points_map_back() {
        let b = board();
        for number in 1..=20 {
            for factor in 1..=3 {
                let hit = HitResult::new(number, factor).unwrap();
                assert_eq!(map(b.aim_point(hit), &b), Some(hit));
            }
        }
        assert_eq!(map(b.aim_point(HitResult::SINGLE_BULL), &b), Some(HitResult::SINGLE_BULL));
        assert_eq!(b.aim_point(HitResult::DOUBLE_BULL), b.center());
    }

    // ================================================================
    // Property-based tests (proptest)
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn beyond_double_ring_always_misses(
                angle in 0.0f64..360.0,
                extra in 0.001f64..500.0,
            ) {
                let b = BoardGeometry::default();
                let rad = angle.to_radians();
                let distance = b.radii().double + extra;
                let point = b.center() + DVec2::new(rad.sin(), -rad.cos()) * distance;
                prop_assert_eq!(map(point, &b), None);
            }

            #[test]
            fn bull_zones_ignore_angle(
                angle in 0.0f64..360.0,
                distance in 0.0f64..40.0,
            ) {
                let b = BoardGeometry::default();
                let rad = angle.to_radians();
                let point = b.center() + DVec2::new(rad.sin(), -rad.cos()) * distance;
                let hit = map(point, &b).unwrap();
                prop_assert_eq!(hit.score(), 25);
                let expected = if distance <= 15.0 { Multiplier::Double } else { Multiplier::Single };
                prop_assert_eq!(hit.multiplier(), expected);
            }

            #[test]
            fn mapping_is_deterministic(
                x in -50.0f64..550.0,
                y in -50.0f64..550.0,
            ) {
                let b = BoardGeometry::default();
                let point = DVec2::new(x, y);
                let first = map(point, &b);
                let _ = map(DVec2::new(y, x), &b);
                prop_assert_eq!(first, map(point, &b));
            }

            #[test]
            fn sectors_are_equal_arcs(angle in 0.0f64..360.0) {
                let index = sector_index(angle);
                prop_assert!(index < SECTOR_COUNT);
                // Lower edge of the sector (after the half-sector shift).
                let start = index as f64 * SECTOR_DEGREES - HALF_SECTOR_DEGREES;
                let offset = (angle - start).rem_euclid(360.0);
                prop_assert!(offset < SECTOR_DEGREES + 1e-9, "angle {} offset {}", angle, offset);
            }

            #[test]
            fn numbered_hits_are_valid(
                x in 0.0f64..500.0,
                y in 0.0f64..500.0,
            ) {
                let b = BoardGeometry::default();
                if let Some(hit) = map(DVec2::new(x, y), &b) {
                    prop_assert!(HitResult::new(hit.score(), hit.multiplier().factor()).is_ok());
                }
            }
        }
    }
}
