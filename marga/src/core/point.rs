//! Point, bounds and grid coordinate types.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Integer units per world unit (1 unit = 1 mm for meter-scaled worlds).
pub const PRECISION: i32 = 1000;

/// Fixed-point 3D position.
///
/// Follows REP-103: X forward, Y left, Z up. Graphs live in the X/Y plane;
/// Z is only used for layered graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Int3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Int3 {
    /// Origin
    pub const ZERO: Int3 = Int3 { x: 0, y: 0, z: 0 };

    /// Create from integer units
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Create from world coordinates (meters)
    #[inline]
    pub fn from_world(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: (x * PRECISION as f32).round() as i32,
            y: (y * PRECISION as f32).round() as i32,
            z: (z * PRECISION as f32).round() as i32,
        }
    }

    /// Convert to world coordinates (meters)
    #[inline]
    pub fn to_world(self) -> (f32, f32, f32) {
        let s = PRECISION as f32;
        (self.x as f32 / s, self.y as f32 / s, self.z as f32 / s)
    }

    /// Squared distance in integer units
    #[inline]
    pub fn sqr_distance(&self, other: &Int3) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        // Saturates for points at opposite ends of the i32 range
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// Euclidean distance in integer units
    #[inline]
    pub fn distance(&self, other: &Int3) -> f64 {
        (self.sqr_distance(other) as f64).sqrt()
    }

    /// Euclidean distance rounded to the nearest integer unit
    #[inline]
    pub fn cost_to(&self, other: &Int3) -> u32 {
        self.distance(other).round() as u32
    }

    /// Linear interpolation between two points
    #[inline]
    pub fn lerp(a: Int3, b: Int3, t: f32) -> Int3 {
        let mix = |p: i32, q: i32| p + ((q - p) as f32 * t).round() as i32;
        Int3::new(mix(a.x, b.x), mix(a.y, b.y), mix(a.z, b.z))
    }
}

impl Add for Int3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Int3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Int3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Int3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Axis-aligned integer bounding box (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IntBounds {
    pub min: Int3,
    pub max: Int3,
}

impl IntBounds {
    /// Bounds containing a single point
    pub fn from_point(p: Int3) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include a point
    pub fn encapsulate(&mut self, p: Int3) {
        self.min = Int3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Int3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Check if a point lies inside (inclusive)
    pub fn contains(&self, p: Int3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Check overlap with another box
    pub fn intersects(&self, other: &IntBounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Grid coordinates (integer cell indices)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// X coordinate (column index)
    pub x: i32,
    /// Y coordinate (row index)
    pub y: i32,
}

impl GridCoord {
    /// Create a new grid coordinate
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate
    #[inline]
    pub fn manhattan_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev distance (max of x and y distance)
    #[inline]
    pub fn chebyshev_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The 4 cardinal neighbors (N, E, S, W)
    #[inline]
    pub fn neighbors_4(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x, self.y + 1),
            GridCoord::new(self.x + 1, self.y),
            GridCoord::new(self.x, self.y - 1),
            GridCoord::new(self.x - 1, self.y),
        ]
    }

    /// The 8 neighbors, cardinal first then diagonals (NE, SE, SW, NW)
    #[inline]
    pub fn neighbors_8(&self) -> [GridCoord; 8] {
        [
            GridCoord::new(self.x, self.y + 1),     // N
            GridCoord::new(self.x + 1, self.y),     // E
            GridCoord::new(self.x, self.y - 1),     // S
            GridCoord::new(self.x - 1, self.y),     // W
            GridCoord::new(self.x + 1, self.y + 1), // NE
            GridCoord::new(self.x + 1, self.y - 1), // SE
            GridCoord::new(self.x - 1, self.y - 1), // SW
            GridCoord::new(self.x - 1, self.y + 1), // NW
        ]
    }

    /// True if the offset to `other` is diagonal
    #[inline]
    pub fn is_diagonal_to(&self, other: &GridCoord) -> bool {
        self.x != other.x && self.y != other.y
    }
}

impl Add for GridCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        GridCoord::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for GridCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        GridCoord::new(self.x - other.x, self.y - other.y)
    }
}
