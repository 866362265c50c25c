//! Shared world dimensions and pipeline tuning defaults.

/// Side length of a chunk footprint in voxels (X and Z).
pub const CHUNK_WIDTH: i32 = 16;

/// World height in voxels. Chunks span the full height.
pub const WORLD_HEIGHT: i32 = 128;

/// Height of one sub-mesh slab in voxels.
pub const SLAB_HEIGHT: i32 = 16;

/// Number of sub-mesh slabs stacked in one chunk.
pub const SLABS_PER_CHUNK: usize = (WORLD_HEIGHT / SLAB_HEIGHT) as usize;

/// Voxels in one chunk column block (16 x 128 x 16).
pub const VOXELS_PER_CHUNK: usize = (CHUNK_WIDTH * CHUNK_WIDTH * WORLD_HEIGHT) as usize;

/// Bytes per voxel cell.
pub const VOXEL_BYTES: usize = 6;

/// Bytes of raw voxel data in one chunk.
pub const BYTES_PER_CHUNK: usize = VOXELS_PER_CHUNK * VOXEL_BYTES;

/// Brightest light level for both sunlight and local light.
pub const MAX_LIGHT: u8 = 15;

/// Opacity at which a cell blocks light entirely.
pub const OPAQUE: u8 = 15;

/// Base terrain height in voxels.
pub const SEA_LEVEL: i32 = 64;

/// Default load radius in chunks.
pub const DEFAULT_LOAD_DISTANCE: u32 = 8;

/// Default items handed to a stage worker per activation.
pub const DEFAULT_PER_TICK: usize = 2;

/// Default seconds between dependency scans.
pub const DEFAULT_SCAN_INTERVAL: f32 = 0.25;

/// Default seconds between activations of one stage.
pub const DEFAULT_STAGE_INTERVAL: f32 = 0.5;

/// How long an idle stage worker blocks before re-checking for shutdown.
pub const DEFAULT_WORKER_WAIT_MS: u64 = 500;

/// Default half-circumference of the toroidal chunk world.
pub const DEFAULT_WRAP_DISTANCE: i32 = 1 << 20;

/// Largest accepted wrap distance. Voxel coordinates of wrapped chunks stay
/// within ±2^28, leaving i32 headroom for neighbor offsets and deltas.
pub const MAX_WRAP_DISTANCE: i32 = 1 << 24;
