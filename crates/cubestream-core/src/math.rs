use glam::{IVec2, IVec3};

use crate::constants::{CHUNK_WIDTH, WORLD_HEIGHT};

/// Convert a world-space voxel X/Z to its containing chunk (unwrapped).
pub fn world_to_chunk(world: IVec3) -> IVec2 {
    IVec2::new(
        world.x.div_euclid(CHUNK_WIDTH),
        world.z.div_euclid(CHUNK_WIDTH),
    )
}

/// Convert a world-space voxel coordinate to its offset within the chunk column.
pub fn world_to_local(world: IVec3) -> IVec3 {
    IVec3::new(
        world.x.rem_euclid(CHUNK_WIDTH),
        world.y,
        world.z.rem_euclid(CHUNK_WIDTH),
    )
}

/// First voxel column (X, Z) of a chunk.
pub fn chunk_origin(chunk_x: i32, chunk_z: i32) -> IVec2 {
    IVec2::new(chunk_x * CHUNK_WIDTH, chunk_z * CHUNK_WIDTH)
}

/// Index into a chunk-local voxel buffer. Y varies fastest so columns are contiguous.
#[inline]
pub fn local_index(x: i32, y: i32, z: i32) -> usize {
    ((x * CHUNK_WIDTH + z) * WORLD_HEIGHT + y) as usize
}

/// Pack sunlight and local light into one byte.
pub fn pack_light(sun: u8, local: u8) -> u8 {
    (sun.min(15) << 4) | local.min(15)
}

/// Chunk-index width needed so every chunk within `radius` of the observer
/// gets a distinct slot.
pub fn storage_width(radius: u32) -> usize {
    (2 * radius as usize + 1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_to_chunk_positive() {
        assert_eq!(world_to_chunk(IVec3::new(0, 5, 0)), IVec2::ZERO);
        assert_eq!(world_to_chunk(IVec3::new(15, 0, 15)), IVec2::ZERO);
        assert_eq!(world_to_chunk(IVec3::new(16, 0, 31)), IVec2::new(1, 1));
    }

    #[test]
    fn test_world_to_chunk_negative() {
        assert_eq!(world_to_chunk(IVec3::new(-1, 0, 0)), IVec2::new(-1, 0));
        assert_eq!(world_to_chunk(IVec3::new(-16, 0, -17)), IVec2::new(-1, -2));
    }

    #[test]
    fn test_world_to_local_negative() {
        assert_eq!(world_to_local(IVec3::new(-1, 7, -16)), IVec3::new(15, 7, 0));
    }

    #[test]
    fn test_local_index_covers_chunk() {
        assert_eq!(local_index(0, 0, 0), 0);
        assert_eq!(local_index(0, 1, 0), 1);
        assert_eq!(
            local_index(CHUNK_WIDTH - 1, WORLD_HEIGHT - 1, CHUNK_WIDTH - 1),
            crate::constants::VOXELS_PER_CHUNK - 1
        );
    }

    #[test]
    fn test_storage_width() {
        assert_eq!(storage_width(1), 4);
        assert_eq!(storage_width(3), 8);
        assert_eq!(storage_width(4), 16);
        assert_eq!(storage_width(18), 64);
    }

    #[test]
    fn test_pack_light_clamps() {
        assert_eq!(pack_light(15, 15), 0xFF);
        assert_eq!(pack_light(20, 1), 0xF1);
    }
}
