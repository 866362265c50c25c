use std::collections::HashSet;
use std::sync::Arc;

use cubestream_core::constants::CHUNK_WIDTH;
use cubestream_core::{ChunkCoord, Neighborhood};
use glam::Vec3;

use crate::chunk::{Chunk, ChunkState};
use crate::chunk_storage::ChunkStorage;
use crate::config::StreamingConfig;
use crate::state_machine::{can_build, can_light, has_all_neighbors};

/// Decisions from one dependency scan, applied by the world afterwards.
#[derive(Debug, Default)]
pub struct ScanPlan {
    /// `PendingLight` chunks ready to enter the light stage.
    pub light: Vec<Arc<Chunk>>,
    /// `PendingBuild` chunks ready to enter the build stage.
    pub build: Vec<Arc<Chunk>>,
    /// Missing neighbors to create, with their render anchors.
    pub create: Vec<(ChunkCoord, Vec3)>,
}

impl ScanPlan {
    pub fn is_empty(&self) -> bool {
        self.light.is_empty() && self.build.is_empty() && self.create.is_empty()
    }
}

/// Distance rules for loading, lighting, meshing and unloading chunks
/// around the observer.
#[derive(Debug, Clone, Copy)]
pub struct StreamingPolicy {
    pub load_distance: u32,
    pub light_distance: u32,
    pub build_distance: u32,
    pub unload_distance: u32,
    pub neighborhood: Neighborhood,
}

impl StreamingPolicy {
    pub fn from_config(config: &StreamingConfig) -> Self {
        Self {
            load_distance: config.load_distance,
            light_distance: config.light_distance(),
            build_distance: config.build_distance(),
            unload_distance: config.unload_distance(),
            neighborhood: config.neighborhood,
        }
    }

    pub fn should_unload(&self, chunk: &Chunk, center: ChunkCoord) -> bool {
        !chunk.coord().within(&center, self.unload_distance)
    }

    pub fn should_light(&self, chunk: &Chunk, center: ChunkCoord) -> bool {
        chunk.state() == ChunkState::PendingLight
            && chunk.coord().within(&center, self.light_distance)
            && can_light(chunk, self.neighborhood)
    }

    pub fn should_build(&self, chunk: &Chunk, center: ChunkCoord) -> bool {
        chunk.state() == ChunkState::PendingBuild
            && chunk.coord().within(&center, self.build_distance)
            && can_build(chunk, self.neighborhood)
    }

    /// Inside the load radius with a gap in its neighborhood.
    pub fn wants_neighbors(&self, chunk: &Chunk, center: ChunkCoord) -> bool {
        !chunk.is_unloading()
            && chunk.coord().within(&center, self.load_distance)
            && !has_all_neighbors(chunk, self.neighborhood)
    }

    /// Resident chunks that have drifted out of range.
    pub fn unload_candidates(&self, storage: &ChunkStorage, center: ChunkCoord) -> Vec<Arc<Chunk>> {
        storage
            .resident()
            .iter()
            .filter(|c| self.should_unload(c, center))
            .cloned()
            .collect()
    }

    /// Walk the resident list (in its current order) and decide what moves.
    pub fn plan(&self, storage: &ChunkStorage, center: ChunkCoord) -> ScanPlan {
        let mut plan = ScanPlan::default();
        let mut requested = HashSet::new();
        for chunk in storage.resident() {
            if self.should_light(chunk, center) {
                plan.light.push(chunk.clone());
            } else if self.should_build(chunk, center) {
                plan.build.push(chunk.clone());
            }

            if !self.wants_neighbors(chunk, center) {
                continue;
            }
            for &dir in self.neighborhood.directions() {
                let coord = chunk.coord().step(dir);
                if storage.get(coord).is_some() || !requested.insert(coord) {
                    continue;
                }
                let offset = dir.offset() * CHUNK_WIDTH;
                let anchor = chunk.anchor() + Vec3::new(offset.x as f32, 0.0, offset.y as f32);
                plan.create.push((coord, anchor));
            }
        }
        plan
    }
}
