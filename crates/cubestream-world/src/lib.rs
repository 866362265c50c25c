pub mod chunk;
pub mod chunk_storage;
pub mod config;
pub mod grid;
pub mod light;
pub mod mesh;
pub mod noise;
pub mod pipeline;
pub mod state_machine;
pub mod streaming;
pub mod terrain;
pub mod upload;

use std::sync::Arc;

use cubestream_core::constants::CHUNK_WIDTH;
use cubestream_core::math::{world_to_chunk, world_to_local};
use cubestream_core::{ChunkCoord, ConfigError, MaterialTable, Voxel};
use cubestream_persist::ChunkStore;
use crossbeam_channel::Receiver;
use glam::{IVec2, IVec3, Vec3};
use parking_lot::RwLock;
use serde::Serialize;

use chunk::{Chunk, ChunkState};
use chunk_storage::ChunkStorage;
use config::StreamingConfig;
use grid::VoxelGrid;
use light::relight_column;
use mesh::{MeshBuffer, MeshBuilder, MeshVertex, SlabMesh, SubMesh};
use noise::NoiseSampler;
use pipeline::{
    Completion, Stage, StageContext, StageGate, StageKind, StageWorker, UnloadItem, UnloadSweeper,
};
use state_machine::{link_all, transition};
use streaming::StreamingPolicy;
use terrain::TerrainGenerator;
use upload::VertexUploader;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start stage worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Items waiting in each stage's queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub load: usize,
    pub light: usize,
    pub build: usize,
    pub unload: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorldStats {
    pub resident: usize,
    pub queued: StageCounts,
    /// Stages with a batch on their worker.
    pub in_flight: usize,
    pub drawable: usize,
}

/// A streamed voxel world around one observer.
///
/// Owns the chunk index and drives the load, light and build workers from
/// [`World::advance`], which the application calls once per frame.
pub struct World {
    config: StreamingConfig,
    policy: StreamingPolicy,
    storage: ChunkStorage,
    grid: Arc<RwLock<VoxelGrid>>,
    stages: Vec<Stage>,
    completions: Receiver<Completion>,
    sweeper: UnloadSweeper,
    mesher: MeshBuilder,
    uploader: Box<dyn VertexUploader>,
    /// Built chunks to re-mesh on this thread before the frame ends.
    rebuilds: Vec<Arc<Chunk>>,
    drawable: Vec<Arc<Chunk>>,
    center: ChunkCoord,
    /// Where the last seed chunk sits, with its anchor kept current.
    reference: (ChunkCoord, Vec3),
    scan_elapsed: f32,
    /// Something happened that the next scan may act on.
    scan_pending: bool,
}

impl World {
    pub fn new(
        config: StreamingConfig,
        materials: MaterialTable,
        noise: Arc<dyn NoiseSampler>,
        store: Arc<dyn ChunkStore>,
        uploader: Box<dyn VertexUploader>,
        observer_cell: IVec2,
        position_in_cell: Vec3,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let width = config.storage_width();
        let storage = ChunkStorage::new(width)?;
        let grid = Arc::new(RwLock::new(VoxelGrid::new(width)?));

        let ctx = Arc::new(StageContext {
            grid: grid.clone(),
            terrain: TerrainGenerator::new(noise, &materials, config.caves),
            store: store.clone(),
            materials: materials.clone(),
            neighborhood: config.neighborhood,
        });
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        let mut stages = Vec::with_capacity(StageKind::ALL.len());
        for kind in StageKind::ALL {
            let (interval, quota) = match kind {
                StageKind::Load => (config.load_interval, config.per_tick_load),
                StageKind::Light => (config.light_interval, config.per_tick_light),
                StageKind::Build => (config.build_interval, config.per_tick_build),
            };
            let worker = StageWorker::spawn(kind, ctx.clone(), done_tx.clone(), config.worker_wait())?;
            stages.push(Stage::new(kind, StageGate::new(interval, quota), worker));
        }

        log::info!(
            "world ready: load distance {}, storage width {} chunks, {:?} neighborhood",
            config.load_distance,
            width,
            config.neighborhood
        );

        let center = ChunkCoord::new(observer_cell.x, observer_cell.y, config.wrap_distance);
        let mut world = Self {
            policy: StreamingPolicy::from_config(&config),
            storage,
            grid,
            stages,
            completions: done_rx,
            sweeper: UnloadSweeper::new(store),
            mesher: MeshBuilder::new(&materials, config.neighborhood),
            uploader,
            rebuilds: Vec::new(),
            drawable: Vec::new(),
            center,
            reference: (center, Vec3::ZERO),
            scan_elapsed: 0.0,
            scan_pending: true,
            config,
        };
        world.seed(position_in_cell);
        Ok(world)
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// The chunk the observer currently stands in.
    pub fn center(&self) -> ChunkCoord {
        self.center
    }

    fn coord(&self, x: i32, z: i32) -> ChunkCoord {
        ChunkCoord::new(x, z, self.config.wrap_distance)
    }

    /// The resident chunk at chunk coordinate (x, z).
    pub fn chunk(&self, x: i32, z: i32) -> Option<Arc<Chunk>> {
        self.storage.get(self.coord(x, z)).cloned()
    }

    fn seed(&mut self, position_in_cell: Vec3) {
        self.reference = (self.center, -position_in_cell);
        let chunk = Arc::new(Chunk::new(self.center, -position_in_cell));
        self.insert(chunk);
    }

    /// Render anchor of any chunk, relative to the current seed reference.
    fn anchor_of(&self, coord: ChunkCoord) -> Vec3 {
        let (origin, anchor) = self.reference;
        let d = origin.delta_to(&coord) * CHUNK_WIDTH;
        anchor + Vec3::new(d.x as f32, 0.0, d.y as f32)
    }

    fn insert(&mut self, chunk: Arc<Chunk>) {
        if let Some(evicted) = self.storage.store(chunk.clone()) {
            self.unload(evicted);
        }
        link_all(&self.storage, &chunk, self.config.neighborhood);
        self.stage_mut(StageKind::Load).queue.push(chunk);
        self.scan_pending = true;
    }

    fn stage_mut(&mut self, kind: StageKind) -> &mut Stage {
        &mut self.stages[kind as usize]
    }

    fn unload(&mut self, chunk: Arc<Chunk>) {
        transition(&self.storage, &chunk, ChunkState::Unloading, self.config.neighborhood);
        self.storage.remove(chunk.coord());
        self.drawable.retain(|c| !Arc::ptr_eq(c, &chunk));
        for mesh in chunk.replace_meshes(Vec::new()) {
            self.release(&mesh);
        }
        let snapshot = chunk.is_changed().then(|| {
            let coord = chunk.coord();
            self.grid.read().read_chunk(coord.x, coord.z)
        });
        self.sweeper.push(UnloadItem { chunk, snapshot });
    }

    /// Per-frame entry point.
    ///
    /// `observer_cell` is the chunk the observer is in; `observer_delta` is how
    /// far the observer moved since the last call, in voxels.
    pub fn advance(&mut self, dt: f32, observer_cell: IVec2, observer_delta: Vec3) {
        let center = self.coord(observer_cell.x, observer_cell.y);
        let moved = center != self.center;
        self.center = center;

        if self.apply_completions() > 0 {
            self.scan_pending = true;
        }

        self.scan_elapsed += dt;
        if moved || self.scan_elapsed >= self.config.scan_interval {
            self.scan_elapsed = 0.0;
            self.scan_pending = self.scan(moved);
        }

        let order = self.config.queue_order;
        for stage in &mut self.stages {
            stage.gate.tick(dt);
            stage.dispatch(order, center);
        }

        self.run_rebuilds();
        self.sweeper.start();

        if observer_delta != Vec3::ZERO {
            self.reference.1 -= observer_delta;
            for chunk in self.storage.resident() {
                chunk.move_anchor(observer_delta);
            }
        }
    }

    /// Drain worker results and apply their transitions. Returns how many were applied.
    fn apply_completions(&mut self) -> usize {
        let nb = self.config.neighborhood;
        let mut applied = 0;
        while let Ok(done) = self.completions.try_recv() {
            applied += 1;
            match done {
                Completion::BatchDone(kind) => {
                    log::debug!("{}: batch complete", kind.name());
                    self.stage_mut(kind).gate.close();
                }
                Completion::Loaded(chunk) if !chunk.is_unloading() => {
                    transition(&self.storage, &chunk, ChunkState::Loaded, nb);
                    transition(&self.storage, &chunk, ChunkState::PendingLight, nb);
                }
                Completion::Lit(chunk) if !chunk.is_unloading() => {
                    transition(&self.storage, &chunk, ChunkState::PendingBuild, nb);
                }
                Completion::Built { chunk, slabs } if !chunk.is_unloading() => {
                    self.install_meshes(&chunk, slabs);
                    transition(&self.storage, &chunk, ChunkState::Built, nb);
                    if chunk.take_rebuild_request() {
                        self.queue_rebuild(chunk);
                    }
                }
                Completion::Loaded(chunk)
                | Completion::Lit(chunk)
                | Completion::Built { chunk, .. } => {
                    let c = chunk.coord();
                    log::trace!("discarding result for unloaded chunk ({}, {})", c.x, c.z);
                }
            }
        }
        applied
    }

    /// One dependency scan. Returns true if it changed anything.
    fn scan(&mut self, moved: bool) -> bool {
        if moved || self.storage.added_since_sort() {
            self.storage.sort_by_distance(self.center);
        }

        let leaving = self.policy.unload_candidates(&self.storage, self.center);
        let unloaded = leaving.len();
        for chunk in leaving {
            self.unload(chunk);
        }
        if unloaded > 0 {
            for stage in &mut self.stages {
                stage.queue.purge_unloading();
            }
        }

        let mut reseeded = false;
        if self.storage.get(self.center).is_none() {
            let anchor = self.anchor_of(self.center);
            log::debug!("observer cell ({}, {}) empty, seeding", self.center.x, self.center.z);
            self.insert(Arc::new(Chunk::new(self.center, anchor)));
            reseeded = true;
        }

        let plan = self.policy.plan(&self.storage, self.center);
        let changed = unloaded > 0 || reseeded || !plan.is_empty();
        if changed {
            log::debug!(
                "scan: {} unloaded, {} to light, {} to build, {} created",
                unloaded,
                plan.light.len(),
                plan.build.len(),
                plan.create.len()
            );
        }

        let nb = self.config.neighborhood;
        for chunk in plan.light {
            transition(&self.storage, &chunk, ChunkState::Lighting, nb);
            self.stage_mut(StageKind::Light).queue.push(chunk);
        }
        for chunk in plan.build {
            transition(&self.storage, &chunk, ChunkState::Building, nb);
            self.stage_mut(StageKind::Build).queue.push(chunk);
        }
        for (coord, anchor) in plan.create {
            self.insert(Arc::new(Chunk::new(coord, anchor)));
        }
        changed
    }

    fn upload(&mut self, vertices: &[MeshVertex]) -> Option<MeshBuffer> {
        (!vertices.is_empty()).then(|| MeshBuffer {
            handle: self.uploader.upload_vertices(vertices),
            vertex_count: vertices.len() as u32,
        })
    }

    fn release(&mut self, mesh: &SubMesh) {
        for handle in mesh.buffers() {
            self.uploader.release(handle);
        }
    }

    fn install_meshes(&mut self, chunk: &Arc<Chunk>, slabs: Vec<SlabMesh>) {
        let meshes: Vec<SubMesh> = slabs
            .into_iter()
            .map(|slab| SubMesh {
                slab: slab.slab,
                solid: self.upload(&slab.solid),
                transparent: self.upload(&slab.transparent),
                bounds: slab.bounds,
                renderable: chunk.slab_renderable(slab.slab),
            })
            .collect();
        let has_geometry = !meshes.is_empty();
        for old in chunk.replace_meshes(meshes) {
            self.release(&old);
        }
        let listed = self.drawable.iter().any(|c| Arc::ptr_eq(c, chunk));
        if has_geometry && !listed {
            self.drawable.push(chunk.clone());
        } else if !has_geometry && listed {
            self.drawable.retain(|c| !Arc::ptr_eq(c, chunk));
        }
    }

    fn queue_rebuild(&mut self, chunk: Arc<Chunk>) {
        if !self.rebuilds.iter().any(|c| Arc::ptr_eq(c, &chunk)) {
            self.rebuilds.push(chunk);
        }
    }

    /// Re-mesh edited chunks now, so edits show on the next frame.
    fn run_rebuilds(&mut self) {
        if self.rebuilds.is_empty() {
            return;
        }
        let grid = self.grid.clone();
        for chunk in std::mem::take(&mut self.rebuilds) {
            match chunk.state() {
                ChunkState::Built => {
                    let slabs = self.mesher.build_chunk(&grid.read(), chunk.coord());
                    self.install_meshes(&chunk, slabs);
                }
                ChunkState::Building => chunk.request_rebuild(),
                _ => {}
            }
        }
    }

    /// Every drawable slab with its observer-relative chunk origin. Hidden
    /// slabs are left out.
    pub fn drawable_chunks(&self) -> impl Iterator<Item = (SubMesh, Vec3)> + '_ {
        self.drawable.iter().flat_map(|chunk| {
            let anchor = chunk.anchor();
            chunk
                .meshes()
                .into_iter()
                .filter(|mesh| mesh.renderable)
                .map(move |mesh| (mesh, anchor))
        })
    }

    /// Show or hide one slab of a resident chunk. Returns false when the
    /// chunk is not resident or the slab index is out of range.
    pub fn set_slab_renderable(&self, chunk_x: i32, chunk_z: i32, slab: u32, on: bool) -> bool {
        self.storage
            .get(self.coord(chunk_x, chunk_z))
            .is_some_and(|chunk| chunk.set_slab_renderable(slab, on))
    }

    pub fn stats(&self) -> WorldStats {
        let queued = |kind: StageKind| self.stages[kind as usize].queue.len();
        WorldStats {
            resident: self.storage.len(),
            queued: StageCounts {
                load: queued(StageKind::Load),
                light: queued(StageKind::Light),
                build: queued(StageKind::Build),
                unload: self.sweeper.pending(),
            },
            in_flight: self.stages.iter().filter(|s| s.gate.in_flight()).count(),
            drawable: self.drawable.len(),
        }
    }

    /// Nothing queued, nothing running, and the last scan found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.stages.iter().all(Stage::is_idle)
            && self.rebuilds.is_empty()
            && self.sweeper.pending() == 0
            && !self.sweeper.busy()
            && !self.scan_pending
    }

    fn loaded_owner(&self, wx: i32, y: i32, wz: i32) -> Option<Arc<Chunk>> {
        if !VoxelGrid::in_height(y) {
            return None;
        }
        let cell = world_to_chunk(IVec3::new(wx, y, wz));
        self.storage
            .get(self.coord(cell.x, cell.y))
            .filter(|c| c.state().is_loaded())
            .cloned()
    }

    /// Read a voxel from a loaded chunk.
    pub fn voxel(&self, wx: i32, y: i32, wz: i32) -> Option<Voxel> {
        self.loaded_owner(wx, y, wz)
            .map(|_| self.grid.read().get(wx, y, wz))
    }

    /// Write a voxel and schedule the affected meshes for a rebuild on the
    /// next `advance`. Returns false if the cell is outside the world height
    /// or its chunk is not loaded.
    pub fn set_voxel(&mut self, wx: i32, y: i32, wz: i32, voxel: Voxel) -> bool {
        let Some(owner) = self.loaded_owner(wx, y, wz) else {
            return false;
        };
        {
            let mut grid = self.grid.write();
            grid.set(wx, y, wz, voxel);
            relight_column(&mut grid, wx, wz);
        }
        owner.mark_changed();
        self.scan_pending = true;

        // the owner, plus whichever neighbors share a face or corner with the cell
        let local = world_to_local(IVec3::new(wx, y, wz));
        let edge = |v: i32| match v {
            0 => -1,
            v if v == CHUNK_WIDTH - 1 => 1,
            _ => 0,
        };
        let (ex, ez) = (edge(local.x), edge(local.z));
        let origin = owner.coord();
        let mut targets = vec![origin];
        if ex != 0 {
            targets.push(origin.shift(ex, 0));
        }
        if ez != 0 {
            targets.push(origin.shift(0, ez));
        }
        if ex != 0 && ez != 0 {
            targets.push(origin.shift(ex, ez));
        }

        for coord in targets {
            let Some(chunk) = self.storage.get(coord).cloned() else { continue };
            match chunk.state() {
                ChunkState::Built => self.queue_rebuild(chunk),
                ChunkState::Building => chunk.request_rebuild(),
                _ => {}
            }
        }
        true
    }

    /// Drop every chunk and start again from the observer's current cell.
    pub fn reload(&mut self, position_in_cell: Vec3) {
        log::info!("reloading world at ({}, {})", self.center.x, self.center.z);
        for chunk in self.storage.drain() {
            self.unload(chunk);
        }
        for stage in &mut self.stages {
            stage.queue.clear();
        }
        self.rebuilds.clear();
        self.seed(position_in_cell);
    }
}

impl Drop for World {
    fn drop(&mut self) {
        for stage in &mut self.stages {
            stage.shutdown();
        }
        for chunk in self.storage.drain() {
            self.unload(chunk);
        }
        self.sweeper.flush();
        log::info!("world stopped");
    }
}
