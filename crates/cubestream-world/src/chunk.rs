use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use cubestream_core::constants::SLABS_PER_CHUNK;
use cubestream_core::ChunkCoord;
use glam::Vec3;
use parking_lot::Mutex;

use crate::mesh::SubMesh;

/// Chunk lifecycle state. Declaration order is pipeline order, so
/// `state >= ChunkState::Loaded` means "voxels are in the grid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChunkState {
    /// Created and queued for the load stage.
    Loading = 0,
    /// Voxels are in the grid.
    Loaded = 1,
    /// Waiting for its neighbors before lighting.
    PendingLight = 2,
    /// Queued for or inside the light stage.
    Lighting = 3,
    /// Lit; waiting for its neighbors before meshing.
    PendingBuild = 4,
    /// Queued for or inside the build stage.
    Building = 5,
    /// Meshed and drawable.
    Built = 6,
    /// Leaving the world. Terminal.
    Unloading = 7,
}

impl ChunkState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ChunkState::Loading,
            1 => ChunkState::Loaded,
            2 => ChunkState::PendingLight,
            3 => ChunkState::Lighting,
            4 => ChunkState::PendingBuild,
            5 => ChunkState::Building,
            6 => ChunkState::Built,
            _ => ChunkState::Unloading,
        }
    }

    /// Voxels present in the grid and the chunk still live.
    pub fn is_loaded(self) -> bool {
        self >= ChunkState::Loaded && self != ChunkState::Unloading
    }

    /// Sunlight computed and the chunk still live.
    pub fn is_lit(self) -> bool {
        self >= ChunkState::PendingBuild && self != ChunkState::Unloading
    }
}

/// Per-chunk metadata shared between the control thread and stage workers.
///
/// The control thread is the only writer of state and masks; workers read
/// the state to discard stale work. Voxels live in the shared grid, not here.
#[derive(Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    state: AtomicU8,
    resident: AtomicU8,
    light_ready: AtomicU8,
    build_ready: AtomicU8,
    changed: AtomicBool,
    needs_rebuild: AtomicBool,
    /// One bit per slab the application asked not to draw.
    hidden_slabs: AtomicU8,
    /// Observer-relative render position of the chunk origin.
    anchor: Mutex<Vec3>,
    meshes: Mutex<Vec<SubMesh>>,
}

impl Chunk {
    /// Create a chunk in `Loading` state.
    pub fn new(coord: ChunkCoord, anchor: Vec3) -> Self {
        Self {
            coord,
            state: AtomicU8::new(ChunkState::Loading as u8),
            resident: AtomicU8::new(0),
            light_ready: AtomicU8::new(0),
            build_ready: AtomicU8::new(0),
            changed: AtomicBool::new(false),
            needs_rebuild: AtomicBool::new(false),
            hidden_slabs: AtomicU8::new(0),
            anchor: Mutex::new(anchor),
            meshes: Mutex::new(Vec::new()),
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ChunkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_unloading(&self) -> bool {
        self.state() == ChunkState::Unloading
    }

    /// Neighbors that currently exist in the spatial index.
    pub fn resident_mask(&self) -> u8 {
        self.resident.load(Ordering::Acquire)
    }

    /// Neighbors whose voxels are loaded.
    pub fn light_ready_mask(&self) -> u8 {
        self.light_ready.load(Ordering::Acquire)
    }

    /// Neighbors that are lit.
    pub fn build_ready_mask(&self) -> u8 {
        self.build_ready.load(Ordering::Acquire)
    }

    pub(crate) fn update_masks(&self, bit: u8, resident: bool, loaded: bool, lit: bool) {
        let apply = |mask: &AtomicU8, on: bool| {
            if on {
                mask.fetch_or(bit, Ordering::AcqRel);
            } else {
                mask.fetch_and(!bit, Ordering::AcqRel);
            }
        };
        apply(&self.resident, resident);
        apply(&self.light_ready, loaded);
        apply(&self.build_ready, lit);
    }

    /// Edited since it was loaded; saved on unload.
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    pub(crate) fn request_rebuild(&self) {
        self.needs_rebuild.store(true, Ordering::Release);
    }

    pub(crate) fn take_rebuild_request(&self) -> bool {
        self.needs_rebuild.swap(false, Ordering::AcqRel)
    }

    pub fn anchor(&self) -> Vec3 {
        *self.anchor.lock()
    }

    pub(crate) fn move_anchor(&self, delta: Vec3) {
        *self.anchor.lock() -= delta;
    }

    /// Current drawable slabs.
    pub fn meshes(&self) -> Vec<SubMesh> {
        self.meshes.lock().clone()
    }

    /// Swap in a new slab list, returning the previous one for release.
    pub(crate) fn replace_meshes(&self, meshes: Vec<SubMesh>) -> Vec<SubMesh> {
        std::mem::replace(&mut *self.meshes.lock(), meshes)
    }

    pub fn slab_renderable(&self, slab: u32) -> bool {
        slab < SLABS_PER_CHUNK as u32 && self.hidden_slabs.load(Ordering::Acquire) & (1 << slab) == 0
    }

    /// Show or hide one slab. The setting outlives rebuilds of the slab.
    /// Returns false for a slab index past the top of the chunk.
    pub fn set_slab_renderable(&self, slab: u32, on: bool) -> bool {
        if slab >= SLABS_PER_CHUNK as u32 {
            return false;
        }
        let bit = 1u8 << slab;
        if on {
            self.hidden_slabs.fetch_and(!bit, Ordering::AcqRel);
        } else {
            self.hidden_slabs.fetch_or(bit, Ordering::AcqRel);
        }
        for mesh in self.meshes.lock().iter_mut().filter(|m| m.slab == slab) {
            mesh.renderable = on;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chunk_is_loading() {
        let chunk = Chunk::new(ChunkCoord::new(1, 2, 64), Vec3::ZERO);
        assert_eq!(chunk.state(), ChunkState::Loading);
        assert_eq!(chunk.resident_mask(), 0);
        assert!(!chunk.is_changed());
    }

    #[test]
    fn test_state_order() {
        assert!(ChunkState::Loading < ChunkState::Loaded);
        assert!(ChunkState::Building < ChunkState::Built);
        assert!(ChunkState::Built.is_lit());
        assert!(!ChunkState::Lighting.is_lit());
        assert!(!ChunkState::Unloading.is_loaded());
        assert!(!ChunkState::Unloading.is_lit());
        assert!(ChunkState::PendingLight.is_loaded());
    }

    #[test]
    fn test_state_roundtrip() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 64), Vec3::ZERO);
        for state in [
            ChunkState::Loaded,
            ChunkState::PendingLight,
            ChunkState::Lighting,
            ChunkState::PendingBuild,
            ChunkState::Building,
            ChunkState::Built,
            ChunkState::Unloading,
        ] {
            chunk.set_state(state);
            assert_eq!(chunk.state(), state);
        }
    }

    #[test]
    fn test_mask_updates() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 64), Vec3::ZERO);
        chunk.update_masks(0b100, true, true, false);
        assert_eq!(chunk.resident_mask(), 0b100);
        assert_eq!(chunk.light_ready_mask(), 0b100);
        assert_eq!(chunk.build_ready_mask(), 0);
        chunk.update_masks(0b100, false, false, false);
        assert_eq!(chunk.resident_mask(), 0);
        assert_eq!(chunk.light_ready_mask(), 0);
    }

    #[test]
    fn test_rebuild_request_is_taken_once() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 64), Vec3::ZERO);
        assert!(!chunk.take_rebuild_request());
        chunk.request_rebuild();
        assert!(chunk.take_rebuild_request());
        assert!(!chunk.take_rebuild_request());
    }

    #[test]
    fn test_anchor_moves_against_observer() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 64), Vec3::new(16.0, 0.0, 0.0));
        chunk.move_anchor(Vec3::new(1.5, 0.0, -2.0));
        assert_eq!(chunk.anchor(), Vec3::new(14.5, 0.0, 2.0));
    }

    #[test]
    fn test_hidden_slab_flags_its_mesh() {
        use crate::mesh::{Aabb, MeshBuffer};
        use crate::upload::BufferHandle;

        let chunk = Chunk::new(ChunkCoord::new(0, 0, 64), Vec3::ZERO);
        let mesh = |slab: u32| SubMesh {
            slab,
            solid: Some(MeshBuffer {
                handle: BufferHandle(slab as u64),
                vertex_count: 6,
            }),
            transparent: None,
            bounds: Aabb {
                min: Vec3::ZERO,
                max: Vec3::ONE,
            },
            renderable: true,
        };
        chunk.replace_meshes(vec![mesh(0), mesh(3)]);

        assert!(chunk.set_slab_renderable(3, false));
        assert!(!chunk.slab_renderable(3));
        assert!(chunk.slab_renderable(0));
        let flags: Vec<_> = chunk.meshes().iter().map(|m| (m.slab, m.renderable)).collect();
        assert_eq!(flags, vec![(0, true), (3, false)]);

        assert!(chunk.set_slab_renderable(3, true));
        assert!(chunk.meshes().iter().all(|m| m.renderable));
        assert!(!chunk.set_slab_renderable(SLABS_PER_CHUNK as u32, false));
    }
}
