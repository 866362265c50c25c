use glam::IVec2;
use serde::{Deserialize, Serialize};

/// One of the 8 lateral neighbor directions of a chunk.
///
/// The discriminant is the bit index in a dependency mask, so the four
/// cardinal directions occupy the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    PosX = 0,
    NegX = 1,
    PosZ = 2,
    NegZ = 3,
    PosXPosZ = 4,
    NegXPosZ = 5,
    PosXNegZ = 6,
    NegXNegZ = 7,
}

/// All 8 lateral directions, cardinals first.
pub const ALL_DIRECTIONS: [Direction; 8] = [
    Direction::PosX,
    Direction::NegX,
    Direction::PosZ,
    Direction::NegZ,
    Direction::PosXPosZ,
    Direction::NegXPosZ,
    Direction::PosXNegZ,
    Direction::NegXNegZ,
];

/// The 4 cardinal directions.
pub const CARDINAL_DIRECTIONS: [Direction; 4] = [
    Direction::PosX,
    Direction::NegX,
    Direction::PosZ,
    Direction::NegZ,
];

impl Direction {
    /// Mask bit for this direction.
    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Chunk offset as (x, z). The vector's `y` component carries Z.
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::PosX => IVec2::new(1, 0),
            Direction::NegX => IVec2::new(-1, 0),
            Direction::PosZ => IVec2::new(0, 1),
            Direction::NegZ => IVec2::new(0, -1),
            Direction::PosXPosZ => IVec2::new(1, 1),
            Direction::NegXPosZ => IVec2::new(-1, 1),
            Direction::PosXNegZ => IVec2::new(1, -1),
            Direction::NegXNegZ => IVec2::new(-1, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
            Direction::PosXPosZ => Direction::NegXNegZ,
            Direction::NegXNegZ => Direction::PosXPosZ,
            Direction::NegXPosZ => Direction::PosXNegZ,
            Direction::PosXNegZ => Direction::NegXPosZ,
        }
    }

    /// Direction for a unit lateral step, or None for zero and non-adjacent offsets.
    pub fn from_offset(dx: i32, dz: i32) -> Option<Direction> {
        match (dx, dz) {
            (1, 0) => Some(Direction::PosX),
            (-1, 0) => Some(Direction::NegX),
            (0, 1) => Some(Direction::PosZ),
            (0, -1) => Some(Direction::NegZ),
            (1, 1) => Some(Direction::PosXPosZ),
            (-1, 1) => Some(Direction::NegXPosZ),
            (1, -1) => Some(Direction::PosXNegZ),
            (-1, -1) => Some(Direction::NegXNegZ),
            _ => None,
        }
    }

    pub fn is_cardinal(self) -> bool {
        (self as u8) < 4
    }
}

/// Which neighbors a chunk's dependency masks track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Neighborhood {
    /// Face-sharing neighbors only (4-bit masks).
    Cardinal,
    /// Face and corner neighbors (8-bit masks).
    #[default]
    Full,
}

impl Neighborhood {
    /// Mask value with every tracked direction set.
    pub fn full_mask(self) -> u8 {
        match self {
            Neighborhood::Cardinal => 0x0F,
            Neighborhood::Full => 0xFF,
        }
    }

    pub fn directions(self) -> &'static [Direction] {
        match self {
            Neighborhood::Cardinal => &CARDINAL_DIRECTIONS,
            Neighborhood::Full => &ALL_DIRECTIONS,
        }
    }
}
