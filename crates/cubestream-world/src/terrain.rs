use std::sync::Arc;

use cubestream_core::constants::*;
use cubestream_core::material::{MAT_DIRT, MAT_GRASS, MAT_STONE};
use cubestream_core::math::local_index;
use cubestream_core::{ChunkCoord, MaterialTable, Voxel};

use crate::noise::{NoiseLayer, NoiseSampler};

/// Rolling ground around sea level.
const BASE_LAYER: NoiseLayer = NoiseLayer {
    octaves: 2,
    frequency: 0.5,
    amplitude: 5.0,
};

/// Broad relief; where it rises above the ground it is filled with dirt.
const RELIEF_LAYER: NoiseLayer = NoiseLayer {
    octaves: 4,
    frequency: 0.05,
    amplitude: 100.0,
};

/// Density below which a cell is carved out as cave.
const CAVE_THRESHOLD: f32 = -0.5;

/// Column-fill terrain generator. A pure function of the chunk coordinate.
pub struct TerrainGenerator {
    noise: Arc<dyn NoiseSampler>,
    stone: Voxel,
    dirt: Voxel,
    grass: Voxel,
    caves: bool,
}

impl TerrainGenerator {
    pub fn new(noise: Arc<dyn NoiseSampler>, materials: &MaterialTable, caves: bool) -> Self {
        Self {
            noise,
            stone: materials.voxel(MAT_STONE),
            dirt: materials.voxel(MAT_DIRT),
            grass: materials.voxel(MAT_GRASS),
            caves,
        }
    }

    /// Fill `out` (chunk-local layout, see [`local_index`]) with the chunk's voxels.
    ///
    /// Terrain layers per column:
    /// - Stone from y=0 up to the base height
    /// - Dirt from there up to the relief height, capped with grass. Columns
    ///   without dirt end in bare stone
    /// - Air above
    pub fn generate_chunk(&self, coord: ChunkCoord, out: &mut [Voxel]) {
        debug_assert_eq!(out.len(), VOXELS_PER_CHUNK);
        let w = CHUNK_WIDTH as usize;
        let mut base = [0f32; (CHUNK_WIDTH * CHUNK_WIDTH) as usize];
        let mut relief = [0f32; (CHUNK_WIDTH * CHUNK_WIDTH) as usize];
        self.noise
            .sample_height_2d(coord.x, coord.z, &BASE_LAYER, &mut base);
        self.noise
            .sample_height_2d(coord.x, coord.z, &RELIEF_LAYER, &mut relief);

        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                let i = lx as usize * w + lz as usize;
                let height = ((base[i] + SEA_LEVEL as f32) as i32).clamp(0, WORLD_HEIGHT);
                let mountain = (relief[i] + SEA_LEVEL as f32) as i32;

                let column = local_index(lx, 0, lz);
                let column = &mut out[column..column + WORLD_HEIGHT as usize];

                column[..height as usize].fill(self.stone);
                let mut top = height;
                if mountain - height > 1 && height < WORLD_HEIGHT {
                    top = mountain.min(WORLD_HEIGHT);
                    column[height as usize..top as usize].fill(self.dirt);
                    column[top as usize - 1] = self.grass;
                }
                column[top as usize..].fill(Voxel::AIR);

                if self.caves {
                    self.carve_caves(coord, lx, lz, top, column);
                }
            }
        }
    }

    /// Hollow out low-density cells. The bottom layer is always kept.
    fn carve_caves(&self, coord: ChunkCoord, lx: i32, lz: i32, top: i32, column: &mut [Voxel]) {
        let wx = coord.x * CHUNK_WIDTH + lx;
        let wz = coord.z * CHUNK_WIDTH + lz;
        for y in 1..top {
            if self.noise.sample_density_3d(wx, y, wz) < CAVE_THRESHOLD {
                column[y as usize] = Voxel::AIR;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{FlatNoise, SimplexNoise};
    use cubestream_core::material::MAT_AIR;

    const WRAP: i32 = 1 << 10;

    fn generator(noise: Arc<dyn NoiseSampler>, caves: bool) -> TerrainGenerator {
        let materials = MaterialTable::builtin().expect("builtin materials");
        TerrainGenerator::new(noise, &materials, caves)
    }

    fn generate(gen: &TerrainGenerator, x: i32, z: i32) -> Vec<Voxel> {
        let mut out = vec![Voxel::AIR; VOXELS_PER_CHUNK];
        gen.generate_chunk(ChunkCoord::new(x, z, WRAP), &mut out);
        out
    }

    #[test]
    fn test_terrain_deterministic() {
        let gen = generator(Arc::new(SimplexNoise::new(42)), true);
        assert_eq!(generate(&gen, 3, -2), generate(&gen, 3, -2));
        let other = generator(Arc::new(SimplexNoise::new(42)), true);
        assert_eq!(generate(&gen, 3, -2), generate(&other, 3, -2));
    }

    #[test]
    fn test_flat_terrain_layers() {
        let gen = generator(Arc::new(FlatNoise { height: 0.0 }), false);
        let data = generate(&gen, 0, 0);
        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                for y in 0..WORLD_HEIGHT {
                    let v = data[local_index(lx, y, lz)];
                    let expected = if y < SEA_LEVEL { MAT_STONE } else { MAT_AIR };
                    assert_eq!(v.material, expected, "({lx}, {y}, {lz})");
                }
            }
        }
    }

    #[test]
    fn test_relief_adds_dirt_and_grass() {
        // base and relief both read 10: relief - base is 0, so no dirt
        let gen = generator(Arc::new(FlatNoise { height: 10.0 }), false);
        let data = generate(&gen, 0, 0);
        assert_eq!(data[local_index(0, SEA_LEVEL + 9, 0)].material, MAT_STONE);
        assert_eq!(data[local_index(0, SEA_LEVEL + 10, 0)].material, MAT_AIR);

        // rugged terrain somewhere shows every layer
        let gen = generator(Arc::new(SimplexNoise::new(5)), false);
        let mut found = [false; 3];
        for cx in -6..6 {
            for v in generate(&gen, cx * 5, cx * 3) {
                match v.material {
                    MAT_STONE => found[0] = true,
                    MAT_DIRT => found[1] = true,
                    MAT_GRASS => found[2] = true,
                    _ => {}
                }
            }
        }
        assert_eq!(found, [true; 3], "stone/dirt/grass");
    }

    /// Even X columns sit low under tall relief, odd ones are bare raised stone.
    struct StripedNoise;

    impl NoiseSampler for StripedNoise {
        fn sample_height_2d(&self, _x: i32, _z: i32, layer: &NoiseLayer, out: &mut [f32]) {
            let base = layer.amplitude == BASE_LAYER.amplitude;
            for (i, h) in out.iter_mut().enumerate() {
                let even = (i / CHUNK_WIDTH as usize) % 2 == 0;
                *h = if even == base { 0.0 } else { 10.0 };
            }
        }

        fn sample_density_3d(&self, _x: i32, _y: i32, _z: i32) -> f32 {
            1.0
        }
    }

    #[test]
    fn test_grass_caps_dirt_but_not_bare_stone() {
        let gen = generator(Arc::new(StripedNoise), false);
        let data = generate(&gen, 0, 0);
        let at = |lx, y| data[local_index(lx, y, 4)].material;

        // dirt from the base height up to the relief, grass on top
        assert_eq!(at(0, SEA_LEVEL - 1), MAT_STONE);
        assert_eq!(at(0, SEA_LEVEL), MAT_DIRT);
        assert_eq!(at(0, SEA_LEVEL + 9), MAT_GRASS);
        assert_eq!(at(0, SEA_LEVEL + 10), MAT_AIR);

        // the raised column has no dirt and stays stone to its top
        assert_eq!(at(1, SEA_LEVEL + 9), MAT_STONE);
        assert_eq!(at(1, SEA_LEVEL + 10), MAT_AIR);
        let column = local_index(1, 0, 4);
        assert!(data[column..column + WORLD_HEIGHT as usize]
            .iter()
            .all(|v| v.material == MAT_STONE || v.material == MAT_AIR));
    }

    #[test]
    fn test_heights_clamped_to_world() {
        let gen = generator(Arc::new(FlatNoise { height: 500.0 }), false);
        let data = generate(&gen, 0, 0);
        assert!(data.iter().all(|v| v.material == MAT_STONE));

        let gen = generator(Arc::new(FlatNoise { height: -500.0 }), false);
        let data = generate(&gen, 0, 0);
        assert!(data.iter().all(|v| *v == Voxel::AIR));
    }

    #[test]
    fn test_caves_keep_bottom_layer() {
        let gen = generator(Arc::new(SimplexNoise::new(9)), true);
        let data = generate(&gen, 1, 1);
        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                assert_ne!(data[local_index(lx, 0, lz)].material, MAT_AIR);
            }
        }
    }
}
