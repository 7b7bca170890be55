//! Grid coordinates and development tiers.
//!
//! Every zone is a 50x50 grid. [`Position`] is a validated coordinate inside
//! that grid; constructors reject anything outside `[0, 49]`. The border
//! rows and columns are exits or walls, so building is restricted to the
//! interior `[1, 48]`.
//!
//! [`Tier`] is the zone's development level, 1 through 8.

use serde::{Deserialize, Serialize};

/// Number of cells along one side of a zone.
pub const GRID_SIZE: usize = 50;

/// Largest valid coordinate value.
pub const GRID_MAX: u8 = 49;

/// Total number of cells in a zone.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Offsets of the 8-neighborhood, row-major.
pub const NEIGHBOR_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A cell coordinate inside a zone.
///
/// Ordering is row-major (`y` first, then `x`), which is the order every
/// deterministic tie-break in the planner relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column, 0..=49.
    pub x: u8,
    /// Row, 0..=49.
    pub y: u8,
}

impl Position {
    /// Geometric center of a zone.
    pub const CENTER: Self = Self { x: 25, y: 25 };

    /// Create a position, returning `None` if either coordinate is off-grid.
    pub const fn new(x: u8, y: u8) -> Option<Self> {
        if x > GRID_MAX || y > GRID_MAX {
            return None;
        }
        Some(Self { x, y })
    }

    /// Create a position from wide signed coordinates, as produced by
    /// centroid math.
    pub fn from_signed(x: i32, y: i32) -> Option<Self> {
        let x = u8::try_from(x).ok()?;
        let y = u8::try_from(y).ok()?;
        Self::new(x, y)
    }

    /// Chebyshev (king-move) distance to another position.
    pub const fn distance_to(self, other: Self) -> u8 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Translate by a signed offset. `None` if the result leaves the grid.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Self::new(x, y)
    }

    /// Whether the cell lies on the zone border (row or column 0 or 49).
    pub const fn is_border(self) -> bool {
        self.x == 0 || self.y == 0 || self.x == GRID_MAX || self.y == GRID_MAX
    }

    /// Whether the cell lies in the buildable interior `[1, 48]^2`.
    pub const fn is_interior(self) -> bool {
        !self.is_border()
    }

    /// The up-to-8 in-grid neighbors, row-major.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(dx, dy))
    }

    /// Every in-grid cell within Chebyshev distance `radius`, including
    /// `self`, row-major.
    pub fn within(self, radius: u8) -> impl Iterator<Item = Self> {
        let min_x = self.x.saturating_sub(radius);
        let max_x = self.x.saturating_add(radius).min(GRID_MAX);
        let min_y = self.y.saturating_sub(radius);
        let max_y = self.y.saturating_add(radius).min(GRID_MAX);
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| Self { x, y }))
    }

    /// Cells at exactly Chebyshev distance `radius`, row-major.
    pub fn ring(self, radius: u8) -> impl Iterator<Item = Self> {
        self.within(radius)
            .filter(move |cell| cell.distance_to(self) == radius)
    }

    /// Row-major index into a flat `CELL_COUNT` array.
    pub fn index(self) -> usize {
        usize::from(self.y)
            .saturating_mul(GRID_SIZE)
            .saturating_add(usize::from(self.x))
    }

    /// Inverse of [`Position::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        let x = u8::try_from(index.checked_rem(GRID_SIZE)?).ok()?;
        let y = u8::try_from(index.checked_div(GRID_SIZE)?).ok()?;
        Self::new(x, y)
    }

    /// Stable string key (`"x,y"`) used by persisted maps.
    pub fn key(self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a key produced by [`Position::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Self::new(x.trim().parse().ok()?, y.trim().parse().ok()?)
    }

    /// Iterate all 2,500 cells of a zone, row-major.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=GRID_MAX).flat_map(|y| (0..=GRID_MAX).map(move |x| Self { x, y }))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Zone development tier, 1 through 8.
///
/// Serialized as a bare integer; deserialization rejects values outside
/// the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier(u8);

impl Tier {
    /// Lowest tier.
    pub const MIN: Self = Self(1);
    /// Highest tier.
    pub const MAX: Self = Self(8);

    /// Create a tier, returning `None` outside `1..=8`.
    pub const fn new(level: u8) -> Option<Self> {
        if level >= Self::MIN.0 && level <= Self::MAX.0 {
            Some(Self(level))
        } else {
            None
        }
    }

    /// Create a tier, clamping out-of-range values into `1..=8`.
    pub const fn clamped(level: u8) -> Self {
        if level < Self::MIN.0 {
            Self::MIN
        } else if level > Self::MAX.0 {
            Self::MAX
        } else {
            Self(level)
        }
    }

    /// The numeric level.
    pub const fn level(self) -> u8 {
        self.0
    }

    /// All tiers from 1 up to and including `self`.
    pub fn up_to(self) -> impl Iterator<Item = Self> {
        (Self::MIN.0..=self.0).map(Self)
    }

    /// All eight tiers in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::MAX.up_to()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("tier {level} outside 1..=8"))
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.0
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    // -----------------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_off_grid_coordinates() {
        assert!(Position::new(50, 0).is_none());
        assert!(Position::new(0, 50).is_none());
        assert!(Position::new(49, 49).is_some());
        assert!(Position::from_signed(-1, 3).is_none());
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(pos(10, 10).distance_to(pos(13, 11)), 3);
        assert_eq!(pos(10, 10).distance_to(pos(10, 10)), 0);
        assert_eq!(pos(0, 49).distance_to(pos(49, 0)), 49);
    }

    #[test]
    fn corner_has_three_neighbors() {
        assert_eq!(pos(0, 0).neighbors().count(), 3);
        assert_eq!(pos(20, 20).neighbors().count(), 8);
    }

    #[test]
    fn within_clips_to_grid() {
        assert_eq!(pos(0, 0).within(1).count(), 4);
        assert_eq!(pos(25, 25).within(2).count(), 25);
    }

    #[test]
    fn ring_only_contains_exact_radius() {
        let center = pos(25, 25);
        let ring: Vec<_> = center.ring(2).collect();
        assert_eq!(ring.len(), 16);
        assert!(ring.iter().all(|p| p.distance_to(center) == 2));
    }

    #[test]
    fn interior_excludes_border() {
        assert!(!pos(0, 10).is_interior());
        assert!(!pos(10, 49).is_interior());
        assert!(pos(1, 48).is_interior());
    }

    #[test]
    fn index_round_trips() {
        let p = pos(17, 33);
        assert_eq!(Position::from_index(p.index()), Some(p));
        assert_eq!(Position::all().count(), CELL_COUNT);
    }

    #[test]
    fn key_round_trips() {
        let p = pos(3, 41);
        assert_eq!(p.key(), "3,41");
        assert_eq!(Position::from_key("3,41"), Some(p));
        assert!(Position::from_key("3;41").is_none());
    }

    #[test]
    fn ordering_is_row_major() {
        assert!(pos(40, 1) < pos(0, 2));
        assert!(pos(1, 5) < pos(2, 5));
    }

    // -----------------------------------------------------------------------
    // Tier
    // -----------------------------------------------------------------------

    #[test]
    fn tier_bounds() {
        assert!(Tier::new(0).is_none());
        assert!(Tier::new(9).is_none());
        assert_eq!(Tier::clamped(12), Tier::MAX);
        assert_eq!(Tier::clamped(0), Tier::MIN);
    }

    #[test]
    fn tier_up_to_is_inclusive() {
        let levels: Vec<u8> = Tier::new(3).unwrap().up_to().map(Tier::level).collect();
        assert_eq!(levels, vec![1, 2, 3]);
    }

    #[test]
    fn tier_deserialization_validates() {
        let ok: Result<Tier, _> = serde_json::from_str("4");
        assert_eq!(ok.ok(), Tier::new(4));
        let bad: Result<Tier, _> = serde_json::from_str("11");
        assert!(bad.is_err());
    }
}
