use cubestream_core::{Direction, Neighborhood};

use crate::chunk::{Chunk, ChunkState};
use crate::chunk_storage::ChunkStorage;

/// Record that the neighbor in `dir` is now in `state`.
///
/// A neighbor counts as resident while it exists, as light-ready once its
/// voxels are loaded and as build-ready once it is lit. `Unloading` clears
/// all three bits.
pub fn on_neighbor_state(chunk: &Chunk, dir: Direction, state: ChunkState) {
    let live = state != ChunkState::Unloading;
    chunk.update_masks(dir.bit(), live, state.is_loaded(), state.is_lit());
}

/// Consolidate flags both ways when `neighbor` first becomes adjacent to
/// `chunk` in direction `dir`.
pub fn link(chunk: &Chunk, neighbor: &Chunk, dir: Direction) {
    on_neighbor_state(chunk, dir, neighbor.state());
    on_neighbor_state(neighbor, dir.opposite(), chunk.state());
}

/// Link a freshly stored chunk with every resident neighbor.
pub fn link_all(storage: &ChunkStorage, chunk: &Chunk, neighborhood: Neighborhood) {
    for &dir in neighborhood.directions() {
        if let Some(neighbor) = storage.get(chunk.coord().step(dir)) {
            link(chunk, neighbor, dir);
        }
    }
}

/// Fan a state change out to the resident neighbors, keyed by coordinate.
pub fn notify_neighbors(storage: &ChunkStorage, chunk: &Chunk, neighborhood: Neighborhood) {
    let state = chunk.state();
    for &dir in neighborhood.directions() {
        if let Some(neighbor) = storage.get(chunk.coord().step(dir)) {
            on_neighbor_state(neighbor, dir.opposite(), state);
        }
    }
}

/// Move `chunk` to `state` and notify its neighbors.
pub fn transition(
    storage: &ChunkStorage,
    chunk: &Chunk,
    state: ChunkState,
    neighborhood: Neighborhood,
) {
    chunk.set_state(state);
    notify_neighbors(storage, chunk, neighborhood);
}

/// Every tracked neighbor is loaded.
pub fn can_light(chunk: &Chunk, neighborhood: Neighborhood) -> bool {
    let full = neighborhood.full_mask();
    chunk.light_ready_mask() & full == full
}

/// Every tracked neighbor is lit.
pub fn can_build(chunk: &Chunk, neighborhood: Neighborhood) -> bool {
    let full = neighborhood.full_mask();
    chunk.build_ready_mask() & full == full
}

/// Every tracked neighbor exists.
pub fn has_all_neighbors(chunk: &Chunk, neighborhood: Neighborhood) -> bool {
    let full = neighborhood.full_mask();
    chunk.resident_mask() & full == full
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubestream_core::ChunkCoord;
    use glam::Vec3;
    use std::sync::Arc;

    const WRAP: i32 = 64;

    fn add(storage: &mut ChunkStorage, x: i32, z: i32, nb: Neighborhood) -> Arc<Chunk> {
        let chunk = Arc::new(Chunk::new(ChunkCoord::new(x, z, WRAP), Vec3::ZERO));
        storage.store(chunk.clone());
        link_all(storage, &chunk, nb);
        chunk
    }

    #[test]
    fn test_link_consolidates_both_ways() {
        let nb = Neighborhood::Full;
        let mut storage = ChunkStorage::new(8).expect("storage");
        let a = add(&mut storage, 0, 0, nb);
        transition(&storage, &a, ChunkState::PendingBuild, nb);
        let b = add(&mut storage, 1, 0, nb);

        assert_eq!(a.resident_mask(), Direction::PosX.bit());
        assert_eq!(a.light_ready_mask(), 0, "b is still loading");
        assert_eq!(b.resident_mask(), Direction::NegX.bit());
        assert_eq!(b.light_ready_mask(), Direction::NegX.bit());
        assert_eq!(b.build_ready_mask(), Direction::NegX.bit());
    }

    #[test]
    fn test_notifications_advance_masks() {
        let nb = Neighborhood::Cardinal;
        let mut storage = ChunkStorage::new(8).expect("storage");
        let center = add(&mut storage, 0, 0, nb);
        let around: Vec<_> = [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .map(|&(x, z)| add(&mut storage, x, z, nb))
            .collect();
        assert!(has_all_neighbors(&center, nb));
        assert!(!can_light(&center, nb));

        for n in &around {
            transition(&storage, n, ChunkState::Loaded, nb);
        }
        assert!(can_light(&center, nb));
        assert!(!can_build(&center, nb));

        for n in &around {
            transition(&storage, n, ChunkState::PendingBuild, nb);
        }
        assert!(can_build(&center, nb));

        transition(&storage, &around[2], ChunkState::Unloading, nb);
        storage.remove(around[2].coord());
        assert!(!has_all_neighbors(&center, nb));
        assert!(!can_light(&center, nb));
        assert!(!can_build(&center, nb));
    }

    #[test]
    fn test_diagonals_only_tracked_in_full_neighborhood() {
        let mut storage = ChunkStorage::new(8).expect("storage");
        let center = add(&mut storage, 0, 0, Neighborhood::Cardinal);
        add(&mut storage, 1, 1, Neighborhood::Cardinal);
        assert_eq!(center.resident_mask(), 0);

        let mut storage = ChunkStorage::new(8).expect("storage");
        let center = add(&mut storage, 0, 0, Neighborhood::Full);
        add(&mut storage, 1, 1, Neighborhood::Full);
        assert_eq!(center.resident_mask(), Direction::PosXPosZ.bit());
    }

    /// Drive a 5x5 patch through random transitions and check that the
    /// gates never open before every neighbor really reached the stage.
    #[test]
    fn test_dependency_gating_random_transitions() {
        for nb in [Neighborhood::Cardinal, Neighborhood::Full] {
            let mut storage = ChunkStorage::new(8).expect("storage");
            let mut chunks = Vec::new();
            for x in -2..=2 {
                for z in -2..=2 {
                    chunks.push(add(&mut storage, x, z, nb));
                }
            }
            let mut rng = 0x9E37_79B9_7F4A_7C15u64;
            for _ in 0..3000 {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let chunk = &chunks[(rng >> 33) as usize % chunks.len()];
                let next = match chunk.state() {
                    ChunkState::Loading => ChunkState::Loaded,
                    ChunkState::Loaded => ChunkState::PendingLight,
                    ChunkState::PendingLight if can_light(chunk, nb) => ChunkState::Lighting,
                    ChunkState::Lighting => ChunkState::PendingBuild,
                    ChunkState::PendingBuild if can_build(chunk, nb) => ChunkState::Building,
                    ChunkState::Building => ChunkState::Built,
                    _ => continue,
                };
                if next == ChunkState::Lighting || next == ChunkState::Building {
                    for &dir in nb.directions() {
                        let n = storage
                            .get(chunk.coord().step(dir))
                            .map(|n| n.state())
                            .expect("gate opened with a missing neighbor");
                        if next == ChunkState::Lighting {
                            assert!(n.is_loaded(), "lit next to {n:?}");
                        } else {
                            assert!(n.is_lit(), "built next to {n:?}");
                        }
                    }
                }
                transition(&storage, chunk, next, nb);
            }
        }
    }
}
