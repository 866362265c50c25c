use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// Chunk-grid coordinate on a torus of circumference `2 * wrap` chunks.
///
/// Components always lie in `[-wrap, wrap)`. Chunks have no Y coordinate;
/// each spans the full world height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
    wrap: i32,
}

/// Fold `v` into `[-wrap, wrap)`.
fn normalize(v: i64, wrap: i32) -> i32 {
    let w = wrap as i64;
    ((v + w).rem_euclid(2 * w) - w) as i32
}

impl ChunkCoord {
    /// Build a coordinate, folding any out-of-range component onto the torus.
    pub fn new(x: i32, z: i32, wrap: i32) -> Self {
        debug_assert!(wrap > 0, "wrap distance must be positive");
        Self {
            x: normalize(x as i64, wrap),
            z: normalize(z as i64, wrap),
            wrap,
        }
    }

    pub fn wrap(&self) -> i32 {
        self.wrap
    }

    /// Offset by a signed chunk delta with wraparound. Exactly invertible.
    pub fn shift(self, dx: i32, dz: i32) -> Self {
        Self {
            x: normalize(self.x as i64 + dx as i64, self.wrap),
            z: normalize(self.z as i64 + dz as i64, self.wrap),
            wrap: self.wrap,
        }
    }

    pub fn step(self, dir: Direction) -> Self {
        let o = dir.offset();
        self.shift(o.x, o.y)
    }

    /// Shortest signed per-axis difference from `self` to `other` across the seam.
    pub fn delta_to(&self, other: &ChunkCoord) -> IVec2 {
        IVec2::new(
            normalize(other.x as i64 - self.x as i64, self.wrap),
            normalize(other.z as i64 - self.z as i64, self.wrap),
        )
    }

    /// Mask bit of the direction in which `other` neighbors `self`, or 0.
    pub fn direction_bit(&self, other: &ChunkCoord) -> u8 {
        let d = self.delta_to(other);
        Direction::from_offset(d.x, d.y).map_or(0, Direction::bit)
    }

    pub fn distance_squared(&self, other: &ChunkCoord) -> i64 {
        let d = self.delta_to(other);
        let (dx, dz) = (d.x as i64, d.y as i64);
        dx * dx + dz * dz
    }

    /// Euclidean distance in chunks, truncated.
    pub fn distance(&self, other: &ChunkCoord) -> u32 {
        (self.distance_squared(other) as f64).sqrt() as u32
    }

    /// Whether `other` lies within `radius` chunks (inclusive, exact).
    pub fn within(&self, other: &ChunkCoord, radius: u32) -> bool {
        let r = radius as i64;
        self.distance_squared(other) <= r * r
    }
}
