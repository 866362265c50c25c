use cubestream_core::constants::CHUNK_WIDTH;

/// Fractal noise parameters for one height field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLayer {
    pub octaves: u32,
    /// Frequency of the first octave, in cycles per chunk.
    pub frequency: f64,
    /// Amplitude of the first octave, in voxels.
    pub amplitude: f64,
}

/// Deterministic noise consumed by the terrain generator.
///
/// The same inputs must always give the same output, so evicted chunks
/// regenerate identically.
pub trait NoiseSampler: Send + Sync {
    /// Fill `out` (16x16, indexed `x * 16 + z`) with height offsets in voxels
    /// for the chunk whose origin column is `(chunk_x, chunk_z)`.
    fn sample_height_2d(&self, chunk_x: i32, chunk_z: i32, layer: &NoiseLayer, out: &mut [f32]);

    /// Density at a world voxel position; negative values are hollow.
    fn sample_density_3d(&self, x: i32, y: i32, z: i32) -> f32;
}

/// Seeded simplex noise with an octave sum.
pub struct SimplexNoise {
    /// Permutation table for simplex noise (doubled for wrapping).
    perm: [u8; 512],
}

impl SimplexNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            perm: Self::build_permutation(seed),
        }
    }

    /// Sum of `octaves` layers, doubling frequency and halving amplitude each time.
    fn fractal_2d(&self, x: f64, z: f64, layer: &NoiseLayer) -> f64 {
        let mut freq = layer.frequency;
        let mut amp = layer.amplitude;
        let mut total = 0.0;
        for octave in 0..layer.octaves {
            let shift = octave as f64 * 37.1;
            total += self.simplex2d(x * freq + shift, z * freq + shift) * amp;
            freq *= 2.0;
            amp *= 0.5;
        }
        total
    }

    /// 2D simplex noise. Returns value in [-1, 1].
    fn simplex2d(&self, x: f64, z: f64) -> f64 {
        const F2: f64 = 0.5 * (1.7320508075688772 - 1.0); // (sqrt(3)-1)/2
        const G2: f64 = (3.0 - 1.7320508075688772) / 6.0; // (3-sqrt(3))/6

        let s = (x + z) * F2;
        let i = (x + s).floor();
        let j = (z + s).floor();

        let t = (i + j) * G2;
        let x0 = x - (i - t);
        let y0 = z - (j - t);

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;

        let gi0 = self.perm[ii + self.perm[jj] as usize] as usize;
        let gi1 = self.perm[ii + i1 + self.perm[jj + j1] as usize] as usize;
        let gi2 = self.perm[ii + 1 + self.perm[jj + 1] as usize] as usize;

        let n0 = Self::corner_2d(gi0, x0, y0);
        let n1 = Self::corner_2d(gi1, x1, y1);
        let n2 = Self::corner_2d(gi2, x2, y2);

        70.0 * (n0 + n1 + n2)
    }

    fn corner_2d(gi: usize, x: f64, y: f64) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let t = t * t;
            let g = &GRAD3[gi % 12];
            t * t * (g[0] * x + g[1] * y)
        }
    }

    /// 3D simplex noise. Returns value in roughly [-1, 1].
    fn simplex3d(&self, x: f64, y: f64, z: f64) -> f64 {
        const F3: f64 = 1.0 / 3.0;
        const G3: f64 = 1.0 / 6.0;

        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();
        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Which simplex the point sits in.
        let (o1, o2) = if x0 >= y0 {
            if y0 >= z0 {
                ([1, 0, 0], [1, 1, 0])
            } else if x0 >= z0 {
                ([1, 0, 0], [1, 0, 1])
            } else {
                ([0, 0, 1], [1, 0, 1])
            }
        } else if y0 < z0 {
            ([0, 0, 1], [0, 1, 1])
        } else if x0 < z0 {
            ([0, 1, 0], [0, 1, 1])
        } else {
            ([0, 1, 0], [1, 1, 0])
        };

        let offsets = [
            [x0, y0, z0],
            [
                x0 - o1[0] as f64 + G3,
                y0 - o1[1] as f64 + G3,
                z0 - o1[2] as f64 + G3,
            ],
            [
                x0 - o2[0] as f64 + 2.0 * G3,
                y0 - o2[1] as f64 + 2.0 * G3,
                z0 - o2[2] as f64 + 2.0 * G3,
            ],
            [x0 - 1.0 + 3.0 * G3, y0 - 1.0 + 3.0 * G3, z0 - 1.0 + 3.0 * G3],
        ];
        let corners = [[0, 0, 0], o1, o2, [1, 1, 1]];

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;

        let mut total = 0.0;
        for (c, p) in corners.iter().zip(offsets.iter()) {
            let t = 0.6 - p[0] * p[0] - p[1] * p[1] - p[2] * p[2];
            if t < 0.0 {
                continue;
            }
            let gi = self.perm
                [ii + c[0] + self.perm[jj + c[1] + self.perm[kk + c[2]] as usize] as usize]
                as usize
                % 12;
            let g = &GRAD3[gi];
            let t = t * t;
            total += t * t * (g[0] * p[0] + g[1] * p[1] + g[2] * p[2]);
        }
        32.0 * total
    }

    fn build_permutation(seed: u64) -> [u8; 512] {
        let mut p: [u8; 256] = [0; 256];
        for (i, val) in p.iter_mut().enumerate() {
            *val = i as u8;
        }

        // Fisher-Yates shuffle with seed
        let mut rng = seed;
        for i in (1..256).rev() {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let j = (rng >> 33) as usize % (i + 1);
            p.swap(i, j);
        }

        let mut perm = [0u8; 512];
        for (i, val) in perm.iter_mut().enumerate() {
            *val = p[i & 255];
        }
        perm
    }
}

const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

impl NoiseSampler for SimplexNoise {
    fn sample_height_2d(&self, chunk_x: i32, chunk_z: i32, layer: &NoiseLayer, out: &mut [f32]) {
        let w = CHUNK_WIDTH as usize;
        debug_assert_eq!(out.len(), w * w);
        for lx in 0..w {
            for lz in 0..w {
                // chunk units, so `frequency` reads as cycles per chunk
                let x = chunk_x as f64 + lx as f64 / w as f64;
                let z = chunk_z as f64 + lz as f64 / w as f64;
                out[lx * w + lz] = self.fractal_2d(x, z, layer) as f32;
            }
        }
    }

    fn sample_density_3d(&self, x: i32, y: i32, z: i32) -> f32 {
        const SCALE: f64 = 1.0 / 24.0;
        self.simplex3d(x as f64 * SCALE, y as f64 * SCALE, z as f64 * SCALE) as f32
    }
}

/// Constant-height noise: flat terrain, solid density. For tests and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatNoise {
    pub height: f32,
}

impl NoiseSampler for FlatNoise {
    fn sample_height_2d(&self, _chunk_x: i32, _chunk_z: i32, _layer: &NoiseLayer, out: &mut [f32]) {
        out.fill(self.height);
    }

    fn sample_density_3d(&self, _x: i32, _y: i32, _z: i32) -> f32 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: NoiseLayer = NoiseLayer {
        octaves: 3,
        frequency: 0.5,
        amplitude: 5.0,
    };

    #[test]
    fn test_height_field_deterministic() {
        let a = SimplexNoise::new(42);
        let b = SimplexNoise::new(42);
        let mut fa = [0f32; 256];
        let mut fb = [0f32; 256];
        a.sample_height_2d(-3, 7, &LAYER, &mut fa);
        b.sample_height_2d(-3, 7, &LAYER, &mut fb);
        assert_eq!(fa, fb);
    }

    #[test]
    fn test_seeds_differ() {
        let mut fa = [0f32; 256];
        let mut fb = [0f32; 256];
        SimplexNoise::new(1).sample_height_2d(2, 2, &LAYER, &mut fa);
        SimplexNoise::new(2).sample_height_2d(2, 2, &LAYER, &mut fb);
        assert_ne!(fa, fb);
    }

    #[test]
    fn test_height_field_bounded_by_amplitude_sum() {
        let noise = SimplexNoise::new(7);
        let mut field = [0f32; 256];
        let bound = (5.0 + 2.5 + 1.25) * 1.25;
        for cx in -4..4 {
            noise.sample_height_2d(cx, 1 - cx, &LAYER, &mut field);
            assert!(field.iter().all(|h| (h.abs() as f64) <= bound));
        }
    }

    #[test]
    fn test_adjacent_chunks_continuous() {
        let noise = SimplexNoise::new(3);
        let mut left = [0f32; 256];
        let mut right = [0f32; 256];
        noise.sample_height_2d(0, 0, &LAYER, &mut left);
        noise.sample_height_2d(1, 0, &LAYER, &mut right);
        // last column of chunk 0 and first column of chunk 1 are one voxel apart
        for z in 0..16 {
            let step = (left[15 * 16 + z] - right[z]).abs();
            assert!(step < 3.0, "step {step} at z={z}");
        }
    }

    #[test]
    fn test_density_in_range() {
        let noise = SimplexNoise::new(11);
        for i in 0..200 {
            let d = noise.sample_density_3d(i * 3 - 300, i % 128, i * 7);
            assert!((-1.5..=1.5).contains(&d), "density {d}");
        }
    }

    #[test]
    fn test_flat_noise() {
        let mut field = [9f32; 256];
        FlatNoise { height: 2.0 }.sample_height_2d(5, 5, &LAYER, &mut field);
        assert!(field.iter().all(|&h| h == 2.0));
    }
}
