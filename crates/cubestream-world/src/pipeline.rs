//! Background stages of the streaming pipeline.
//!
//! Each of load, light and build owns one long-lived worker thread fed
//! through a job channel. Workers only produce data: voxels into the grid,
//! sunlight into the grid, vertices into a completion message. Every
//! lifecycle transition happens on the control thread when it drains the
//! shared completion channel.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use cubestream_core::constants::VOXELS_PER_CHUNK;
use cubestream_core::{ChunkCoord, MaterialTable, Neighborhood, Voxel};
use cubestream_persist::ChunkStore;
use parking_lot::{Mutex, RwLock};

use crate::chunk::Chunk;
use crate::config::QueueOrder;
use crate::grid::VoxelGrid;
use crate::light::propagate_sunlight;
use crate::mesh::{MeshBuilder, SlabMesh};
use crate::terrain::TerrainGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Load = 0,
    Light = 1,
    Build = 2,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Load, StageKind::Light, StageKind::Build];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Load => "load",
            StageKind::Light => "light",
            StageKind::Build => "build",
        }
    }
}

pub(crate) enum StageJob {
    Batch(Vec<Arc<Chunk>>),
    Shutdown,
}

/// Worker output, applied by the control thread.
pub(crate) enum Completion {
    Loaded(Arc<Chunk>),
    Lit(Arc<Chunk>),
    Built {
        chunk: Arc<Chunk>,
        slabs: Vec<SlabMesh>,
    },
    /// The worker finished a whole batch and is idle again.
    BatchDone(StageKind),
}

/// Everything the workers read, shared read-only apart from the grid lock.
pub(crate) struct StageContext {
    pub grid: Arc<RwLock<VoxelGrid>>,
    pub terrain: TerrainGenerator,
    pub store: Arc<dyn ChunkStore>,
    pub materials: MaterialTable,
    /// Neighbors the build gate waits on.
    pub neighborhood: Neighborhood,
}

/// Fill a chunk's columns from the store, or from the generator when the
/// store has nothing usable.
pub(crate) fn load_voxels(ctx: &StageContext, coord: ChunkCoord, scratch: &mut [Voxel]) {
    match ctx.store.try_load(coord) {
        Ok(Some(voxels)) if voxels.len() == VOXELS_PER_CHUNK => {
            ctx.grid.write().write_chunk(coord.x, coord.z, &voxels);
            return;
        }
        Ok(Some(voxels)) => {
            log::warn!(
                "chunk ({}, {}) has {} stored voxels, regenerating",
                coord.x,
                coord.z,
                voxels.len()
            );
        }
        Ok(None) => {}
        Err(e) => {
            log::warn!("chunk ({}, {}) unreadable, regenerating: {}", coord.x, coord.z, e);
        }
    }
    ctx.terrain.generate_chunk(coord, scratch);
    ctx.grid.write().write_chunk(coord.x, coord.z, scratch);
}

pub(crate) struct StageWorker {
    jobs: Sender<StageJob>,
    handle: Option<JoinHandle<()>>,
}

impl StageWorker {
    pub fn spawn(
        kind: StageKind,
        ctx: Arc<StageContext>,
        completions: Sender<Completion>,
        wait: Duration,
    ) -> io::Result<Self> {
        let (jobs, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name(format!("{}-stage", kind.name()))
            .spawn(move || worker_loop(kind, rx, completions, ctx, wait))?;
        Ok(Self {
            jobs,
            handle: Some(handle),
        })
    }

    /// Hand a batch to the worker. False if the worker is gone.
    pub fn send(&self, batch: Vec<Arc<Chunk>>) -> bool {
        self.jobs.send(StageJob::Batch(batch)).is_ok()
    }

    pub fn shutdown(&mut self) {
        let _ = self.jobs.send(StageJob::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("stage worker panicked");
            }
        }
    }
}

fn worker_loop(
    kind: StageKind,
    jobs: Receiver<StageJob>,
    completions: Sender<Completion>,
    ctx: Arc<StageContext>,
    wait: Duration,
) {
    log::info!("{} stage worker started", kind.name());
    let mut scratch = vec![Voxel::AIR; VOXELS_PER_CHUNK];
    let mut mesher = MeshBuilder::new(&ctx.materials, ctx.neighborhood);

    loop {
        let batch = match jobs.recv_timeout(wait) {
            Ok(StageJob::Batch(batch)) => batch,
            Ok(StageJob::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        };

        for chunk in batch {
            if chunk.is_unloading() {
                log::trace!(
                    "{}: skipping unloaded chunk ({}, {})",
                    kind.name(),
                    chunk.coord().x,
                    chunk.coord().z
                );
                continue;
            }
            let coord = chunk.coord();
            let done = match kind {
                StageKind::Load => {
                    load_voxels(&ctx, coord, &mut scratch);
                    Completion::Loaded(chunk)
                }
                StageKind::Light => {
                    propagate_sunlight(&mut ctx.grid.write(), coord);
                    Completion::Lit(chunk)
                }
                StageKind::Build => {
                    let slabs = mesher.build_chunk(&ctx.grid.read(), coord);
                    Completion::Built { chunk, slabs }
                }
            };
            if completions.send(done).is_err() {
                return;
            }
        }
        if completions.send(Completion::BatchDone(kind)).is_err() {
            return;
        }
    }
    log::info!("{} stage worker stopped", kind.name());
}

/// Rate limit for one stage: at most one batch in flight, at most `quota`
/// chunks per batch, and at least `interval` seconds between batches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageGate {
    interval: f32,
    elapsed: f32,
    quota: usize,
    in_flight: bool,
}

impl StageGate {
    pub fn new(interval: f32, quota: usize) -> Self {
        Self {
            interval,
            elapsed: interval,
            quota,
            in_flight: false,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn ready(&self) -> bool {
        !self.in_flight && self.elapsed >= self.interval
    }

    pub fn open(&mut self) {
        self.in_flight = true;
        self.elapsed = 0.0;
    }

    pub fn close(&mut self) {
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn quota(&self) -> usize {
        self.quota
    }
}

/// Control-side backlog of one stage.
#[derive(Default)]
pub(crate) struct StageQueue {
    items: VecDeque<Arc<Chunk>>,
}

impl StageQueue {
    pub fn push(&mut self, chunk: Arc<Chunk>) {
        self.items.push_back(chunk);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drop chunks that started unloading while queued.
    pub fn purge_unloading(&mut self) {
        self.items.retain(|c| !c.is_unloading());
    }

    /// Pop up to `quota` live chunks.
    pub fn take_batch(
        &mut self,
        quota: usize,
        order: QueueOrder,
        center: ChunkCoord,
    ) -> Vec<Arc<Chunk>> {
        if order == QueueOrder::Nearest {
            self.items
                .make_contiguous()
                .sort_by_key(|c| c.coord().distance_squared(&center));
        }
        let mut batch = Vec::with_capacity(quota.min(self.items.len()));
        while batch.len() < quota {
            let Some(chunk) = self.items.pop_front() else { break };
            if chunk.is_unloading() {
                log::trace!("dropping stale queue entry ({}, {})", chunk.coord().x, chunk.coord().z);
                continue;
            }
            batch.push(chunk);
        }
        batch
    }
}

/// Queue, gate and worker of one stage.
pub(crate) struct Stage {
    pub kind: StageKind,
    pub queue: StageQueue,
    pub gate: StageGate,
    worker: StageWorker,
}

impl Stage {
    pub fn new(kind: StageKind, gate: StageGate, worker: StageWorker) -> Self {
        Self {
            kind,
            queue: StageQueue::default(),
            gate,
            worker,
        }
    }

    /// Send the next batch if the gate allows. True if a batch went out.
    pub fn dispatch(&mut self, order: QueueOrder, center: ChunkCoord) -> bool {
        if self.queue.is_empty() || !self.gate.ready() {
            return false;
        }
        let batch = self.queue.take_batch(self.gate.quota(), order, center);
        if batch.is_empty() {
            return false;
        }
        log::debug!("{}: dispatching {} chunks", self.kind.name(), batch.len());
        if !self.worker.send(batch) {
            log::error!("{} worker is gone, batch dropped", self.kind.name());
            return false;
        }
        self.gate.open();
        true
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.gate.in_flight()
    }

    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }
}

/// A chunk on its way out, with its voxels if they need saving.
pub(crate) struct UnloadItem {
    pub chunk: Arc<Chunk>,
    pub snapshot: Option<Vec<Voxel>>,
}

fn save_all(store: &dyn ChunkStore, items: Vec<UnloadItem>) {
    for item in items {
        let Some(voxels) = item.snapshot else { continue };
        let coord = item.chunk.coord();
        if let Err(e) = store.save(coord, &voxels) {
            log::warn!("failed to save chunk ({}, {}): {}", coord.x, coord.z, e);
        }
    }
}

/// Saves unloaded chunks off the control thread, one sweep at a time.
pub(crate) struct UnloadSweeper {
    store: Arc<dyn ChunkStore>,
    pending: Arc<Mutex<Vec<UnloadItem>>>,
    sweep: Option<JoinHandle<()>>,
}

impl UnloadSweeper {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(Vec::new())),
            sweep: None,
        }
    }

    pub fn push(&self, item: UnloadItem) {
        self.pending.lock().push(item);
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn busy(&self) -> bool {
        self.sweep.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn reap(&mut self) {
        if let Some(handle) = self.sweep.take() {
            if handle.join().is_err() {
                log::error!("unload sweep panicked");
            }
        }
    }

    /// Start a sweep if there is work and none is running.
    pub fn start(&mut self) {
        if self.busy() || self.pending() == 0 {
            return;
        }
        self.reap();
        let store = self.store.clone();
        let pending = self.pending.clone();
        let spawned = thread::Builder::new()
            .name("unload-sweep".into())
            .spawn(move || {
                let items = std::mem::take(&mut *pending.lock());
                log::debug!("unload sweep: {} chunks", items.len());
                save_all(store.as_ref(), items);
            });
        match spawned {
            Ok(handle) => self.sweep = Some(handle),
            Err(e) => {
                log::warn!("could not start unload sweep, saving inline: {}", e);
                self.flush();
            }
        }
    }

    /// Wait for any running sweep, then save whatever is left on this thread.
    pub fn flush(&mut self) {
        self.reap();
        let items = std::mem::take(&mut *self.pending.lock());
        save_all(self.store.as_ref(), items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::FlatNoise;
    use cubestream_persist::{MemoryStore, NullStore};
    use glam::Vec3;

    const WRAP: i32 = 64;

    fn chunk(x: i32, z: i32) -> Arc<Chunk> {
        Arc::new(Chunk::new(ChunkCoord::new(x, z, WRAP), Vec3::ZERO))
    }

    fn context(store: Arc<dyn ChunkStore>) -> StageContext {
        let materials = MaterialTable::builtin().expect("builtin materials");
        StageContext {
            grid: Arc::new(RwLock::new(VoxelGrid::new(4).expect("grid"))),
            terrain: TerrainGenerator::new(Arc::new(FlatNoise { height: 0.0 }), &materials, false),
            store,
            materials,
            neighborhood: Neighborhood::Full,
        }
    }

    #[test]
    fn test_gate_limits_rate() {
        let mut gate = StageGate::new(0.5, 2);
        assert!(gate.ready(), "first activation is immediate");
        gate.open();
        assert!(!gate.ready());
        gate.close();
        gate.tick(0.3);
        assert!(!gate.ready());
        gate.tick(0.3);
        assert!(gate.ready());
    }

    #[test]
    fn test_queue_skips_stale_and_respects_quota() {
        let mut queue = StageQueue::default();
        let chunks: Vec<_> = (0..5).map(|i| chunk(i, 0)).collect();
        for c in &chunks {
            queue.push(c.clone());
        }
        chunks[0].set_state(crate::chunk::ChunkState::Unloading);
        let batch = queue.take_batch(2, QueueOrder::Fifo, ChunkCoord::new(0, 0, WRAP));
        assert_eq!(batch.len(), 2);
        assert!(Arc::ptr_eq(&batch[0], &chunks[1]));
        assert!(Arc::ptr_eq(&batch[1], &chunks[2]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_nearest_first() {
        let mut queue = StageQueue::default();
        for (x, z) in [(5, 0), (0, 1), (-3, -3), (0, 0)] {
            queue.push(chunk(x, z));
        }
        let batch = queue.take_batch(4, QueueOrder::Nearest, ChunkCoord::new(0, 0, WRAP));
        let order: Vec<_> = batch.iter().map(|c| (c.coord().x, c.coord().z)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (-3, -3), (5, 0)]);
    }

    #[test]
    fn test_purge_unloading() {
        let mut queue = StageQueue::default();
        let a = chunk(0, 0);
        queue.push(a.clone());
        queue.push(chunk(1, 0));
        a.set_state(crate::chunk::ChunkState::Unloading);
        queue.purge_unloading();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_load_generates_when_store_is_empty() {
        let ctx = context(Arc::new(NullStore));
        let mut scratch = vec![Voxel::AIR; VOXELS_PER_CHUNK];
        load_voxels(&ctx, ChunkCoord::new(1, 1, WRAP), &mut scratch);
        let grid = ctx.grid.read();
        assert_eq!(grid.get(20, 10, 20).material, cubestream_core::material::MAT_STONE);
        assert_eq!(grid.get(20, 100, 20), Voxel::AIR);
    }

    #[test]
    fn test_load_prefers_stored_voxels() {
        let store = Arc::new(MemoryStore::new());
        let coord = ChunkCoord::new(1, 1, WRAP);
        let glass = Voxel::new(cubestream_core::material::MAT_GLASS, 0);
        store
            .save(coord, &vec![glass; VOXELS_PER_CHUNK])
            .expect("save");
        let ctx = context(store);
        let mut scratch = vec![Voxel::AIR; VOXELS_PER_CHUNK];
        load_voxels(&ctx, coord, &mut scratch);
        assert_eq!(ctx.grid.read().get(20, 100, 20), glass);
    }

    #[test]
    fn test_load_regenerates_corrupt_blob() {
        let store = Arc::new(MemoryStore::new());
        let coord = ChunkCoord::new(1, 1, WRAP);
        store.insert_raw(coord, b"not a chunk".to_vec());
        let ctx = context(store);
        let mut scratch = vec![Voxel::AIR; VOXELS_PER_CHUNK];
        load_voxels(&ctx, coord, &mut scratch);
        assert_eq!(ctx.grid.read().get(20, 10, 20).material, cubestream_core::material::MAT_STONE);
    }

    #[test]
    fn test_worker_reports_completions() {
        let ctx = Arc::new(context(Arc::new(NullStore)));
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut worker =
            StageWorker::spawn(StageKind::Load, ctx, tx, Duration::from_millis(10)).expect("spawn");
        let live = chunk(0, 0);
        let stale = chunk(1, 0);
        stale.set_state(crate::chunk::ChunkState::Unloading);
        assert!(worker.send(vec![stale, live.clone()]));

        let first = rx.recv_timeout(Duration::from_secs(5)).expect("completion");
        assert!(matches!(first, Completion::Loaded(ref c) if Arc::ptr_eq(c, &live)));
        let second = rx.recv_timeout(Duration::from_secs(5)).expect("batch done");
        assert!(matches!(second, Completion::BatchDone(StageKind::Load)));
        worker.shutdown();
    }

    #[test]
    fn test_sweeper_saves_only_snapshots() {
        let store = Arc::new(MemoryStore::new());
        let mut sweeper = UnloadSweeper::new(store.clone());
        sweeper.push(UnloadItem {
            chunk: chunk(0, 0),
            snapshot: Some(vec![Voxel::AIR; VOXELS_PER_CHUNK]),
        });
        sweeper.push(UnloadItem {
            chunk: chunk(1, 0),
            snapshot: None,
        });
        sweeper.start();
        sweeper.flush();
        assert_eq!(sweeper.pending(), 0);
        assert!(!sweeper.busy());
        assert_eq!(store.len(), 1);
    }
}
