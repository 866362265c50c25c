use cubestream_core::constants::{CHUNK_WIDTH, VOXELS_PER_CHUNK, WORLD_HEIGHT};
use cubestream_core::math::local_index;
use cubestream_core::{ConfigError, Voxel, WrapIndexer};

/// Toroidal voxel storage shared by every resident chunk.
///
/// X and Z are masked onto a power-of-two extent, so any world column maps
/// to a cell; writing far outside the active region aliases old data. Y is
/// the full world height and is never wrapped: reads above the world return
/// [`Voxel::SKY`], reads below return [`Voxel::BEDROCK`]. The bedrock only
/// stops light; the mesher treats both sides of the world as open.
pub struct VoxelGrid {
    cells: Vec<Voxel>,
    xz: WrapIndexer,
}

impl VoxelGrid {
    /// Grid covering `width_chunks` chunks per side.
    pub fn new(width_chunks: usize) -> Result<Self, ConfigError> {
        let xz = WrapIndexer::new(width_chunks * CHUNK_WIDTH as usize)?;
        let size = xz.size();
        Ok(Self {
            cells: vec![Voxel::AIR; size * size * WORLD_HEIGHT as usize],
            xz,
        })
    }

    /// Extent in voxels along X and Z.
    pub fn extent(&self) -> usize {
        self.xz.size()
    }

    #[inline]
    fn column(&self, x: i32, z: i32) -> usize {
        self.xz.index_2d(x, z) * WORLD_HEIGHT as usize
    }

    #[inline]
    pub fn in_height(y: i32) -> bool {
        (0..WORLD_HEIGHT).contains(&y)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Voxel {
        if y >= WORLD_HEIGHT {
            Voxel::SKY
        } else if y < 0 {
            Voxel::BEDROCK
        } else {
            self.cells[self.column(x, z) + y as usize]
        }
    }

    /// Write a cell. Returns false (and writes nothing) outside the world height.
    pub fn set(&mut self, x: i32, y: i32, z: i32, voxel: Voxel) -> bool {
        if !Self::in_height(y) {
            return false;
        }
        let idx = self.column(x, z) + y as usize;
        self.cells[idx] = voxel;
        true
    }

    #[inline]
    pub fn sunlight(&self, x: i32, y: i32, z: i32) -> u8 {
        self.get(x, y, z).sunlight()
    }

    #[inline]
    pub fn set_sunlight(&mut self, x: i32, y: i32, z: i32, level: u8) {
        if Self::in_height(y) {
            let idx = self.column(x, z) + y as usize;
            self.cells[idx].set_sunlight(level);
        }
    }

    /// Copy a chunk-local buffer (see [`local_index`]) into the chunk's columns.
    pub fn write_chunk(&mut self, chunk_x: i32, chunk_z: i32, voxels: &[Voxel]) {
        debug_assert_eq!(voxels.len(), VOXELS_PER_CHUNK);
        let h = WORLD_HEIGHT as usize;
        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                let src = local_index(lx, 0, lz);
                let dst = self.column(chunk_x * CHUNK_WIDTH + lx, chunk_z * CHUNK_WIDTH + lz);
                self.cells[dst..dst + h].copy_from_slice(&voxels[src..src + h]);
            }
        }
    }

    /// Snapshot a chunk's columns into a chunk-local buffer.
    pub fn read_chunk(&self, chunk_x: i32, chunk_z: i32) -> Vec<Voxel> {
        let h = WORLD_HEIGHT as usize;
        let mut out = vec![Voxel::AIR; VOXELS_PER_CHUNK];
        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                let dst = local_index(lx, 0, lz);
                let src = self.column(chunk_x * CHUNK_WIDTH + lx, chunk_z * CHUNK_WIDTH + lz);
                out[dst..dst + h].copy_from_slice(&self.cells[src..src + h]);
            }
        }
        out
    }
}
