//! Slab mesher: one vertex list per 16-high slab of a chunk, with face
//! culling against the shared grid and smooth per-corner lighting.

use cubestream_core::constants::{CHUNK_WIDTH, SLABS_PER_CHUNK, SLAB_HEIGHT};
use cubestream_core::math::{chunk_origin, pack_light};
use cubestream_core::{ChunkCoord, MaterialTable, Neighborhood, Voxel};
use glam::{IVec2, IVec3, Vec3};

use crate::grid::VoxelGrid;
use crate::upload::BufferHandle;

/// Vertex layout handed to the uploader. 28 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Chunk-local X/Z, absolute Y.
    pub position: [f32; 3],
    pub normal: [i8; 4],
    pub tex_coord: [u16; 2],
    /// Material RGBA.
    pub color: [u8; 4],
    /// Local light tint RGB, then averaged `sun << 4 | local`.
    pub light: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

/// CPU-side geometry of one non-empty slab. Translucent materials get
/// their own list so they can be drawn after the opaque pass.
#[derive(Debug, Clone)]
pub struct SlabMesh {
    pub slab: u32,
    pub solid: Vec<MeshVertex>,
    pub transparent: Vec<MeshVertex>,
    pub bounds: Aabb,
}

impl SlabMesh {
    pub fn vertex_count(&self) -> usize {
        self.solid.len() + self.transparent.len()
    }
}

/// One uploaded vertex list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffer {
    pub handle: BufferHandle,
    pub vertex_count: u32,
}

/// An uploaded slab, as held by a chunk's drawable list.
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub slab: u32,
    pub solid: Option<MeshBuffer>,
    pub transparent: Option<MeshBuffer>,
    pub bounds: Aabb,
    /// Hidden slabs keep their buffers but are skipped when drawing.
    pub renderable: bool,
}

impl SubMesh {
    /// Handles of every buffer this slab owns.
    pub fn buffers(&self) -> impl Iterator<Item = BufferHandle> + '_ {
        self.solid.iter().chain(self.transparent.iter()).map(|b| b.handle)
    }

    pub fn vertex_count(&self) -> u32 {
        self.solid.iter().chain(self.transparent.iter()).map(|b| b.vertex_count).sum()
    }
}

struct FaceDef {
    normal: [i32; 3],
    /// Unit-cube corners in triangle order (a, b, c), (c, b, d).
    corners: [[i32; 3]; 6],
}

const N: i32 = 0;
const P: i32 = 1;

const FACES: [FaceDef; 6] = [
    FaceDef {
        normal: [-1, 0, 0],
        corners: [[N, P, N], [N, P, P], [N, N, N], [N, N, N], [N, P, P], [N, N, P]],
    },
    FaceDef {
        normal: [1, 0, 0],
        corners: [[P, P, P], [P, P, N], [P, N, P], [P, N, P], [P, P, N], [P, N, N]],
    },
    FaceDef {
        normal: [0, -1, 0],
        corners: [[N, N, P], [P, N, P], [N, N, N], [N, N, N], [P, N, P], [P, N, N]],
    },
    FaceDef {
        normal: [0, 1, 0],
        corners: [[N, P, N], [P, P, N], [N, P, P], [N, P, P], [P, P, N], [P, P, P]],
    },
    FaceDef {
        normal: [0, 0, -1],
        corners: [[P, P, N], [N, P, N], [P, N, N], [P, N, N], [N, P, N], [N, N, N]],
    },
    FaceDef {
        normal: [0, 0, 1],
        corners: [[N, P, P], [P, P, P], [N, N, P], [N, N, P], [P, P, P], [P, N, P]],
    },
];

const VERTICES_PER_FACE: usize = 6;

#[derive(Debug, Clone, Copy)]
struct PaletteEntry {
    renderable: bool,
    rgba: [u8; 4],
}

/// Unknown material ids still draw, in a color nobody picks on purpose.
const UNKNOWN: PaletteEntry = PaletteEntry {
    renderable: true,
    rgba: [255, 0, 255, 255],
};

pub struct MeshBuilder {
    palette: Vec<PaletteEntry>,
    /// Whether corner light may sample diagonal chunks. Only gated
    /// neighbors are guaranteed to hold current voxels.
    diagonals: bool,
    solid: Vec<MeshVertex>,
    transparent: Vec<MeshVertex>,
}

impl MeshBuilder {
    pub fn new(materials: &MaterialTable, neighborhood: Neighborhood) -> Self {
        let mut palette = vec![UNKNOWN; 256];
        for def in &materials.materials {
            palette[def.id as usize] = PaletteEntry {
                renderable: def.renderable,
                rgba: def.rgba(),
            };
        }
        Self {
            palette,
            diagonals: neighborhood == Neighborhood::Full,
            solid: Vec::new(),
            transparent: Vec::new(),
        }
    }

    fn renderable(&self, voxel: Voxel) -> bool {
        self.palette[voxel.material as usize].renderable
    }

    /// Visit every visible face in a slab as (cell, voxel, face index).
    fn for_each_face(
        &self,
        grid: &VoxelGrid,
        coord: ChunkCoord,
        slab: u32,
        mut f: impl FnMut(IVec3, Voxel, usize),
    ) {
        let origin = chunk_origin(coord.x, coord.z);
        let y0 = slab as i32 * SLAB_HEIGHT;
        for lx in 0..CHUNK_WIDTH {
            for lz in 0..CHUNK_WIDTH {
                for y in y0..y0 + SLAB_HEIGHT {
                    let cell = IVec3::new(origin.x + lx, y, origin.y + lz);
                    let voxel = grid.get(cell.x, cell.y, cell.z);
                    if !self.renderable(voxel) {
                        continue;
                    }
                    for (i, face) in FACES.iter().enumerate() {
                        let n = cell + IVec3::from_array(face.normal);
                        // nothing exists past the top or bottom of the world
                        let open = !VoxelGrid::in_height(n.y)
                            || grid.get(n.x, n.y, n.z).is_transparent();
                        if open {
                            f(cell, voxel, i);
                        }
                    }
                }
            }
        }
    }

    /// Pre-pass: (solid, transparent) face counts `build_slab` would emit.
    fn face_counts(&self, grid: &VoxelGrid, coord: ChunkCoord, slab: u32) -> (usize, usize) {
        let (mut solid, mut transparent) = (0, 0);
        self.for_each_face(grid, coord, slab, |_, voxel, _| {
            if voxel.is_transparent() {
                transparent += 1;
            } else {
                solid += 1;
            }
        });
        (solid, transparent)
    }

    /// Number of faces `build_slab` would emit.
    pub fn count_faces(&self, grid: &VoxelGrid, coord: ChunkCoord, slab: u32) -> usize {
        let (solid, transparent) = self.face_counts(grid, coord, slab);
        solid + transparent
    }

    /// Mesh one slab. None when it has no visible faces.
    pub fn build_slab(
        &mut self,
        grid: &VoxelGrid,
        coord: ChunkCoord,
        slab: u32,
    ) -> Option<SlabMesh> {
        let (solid_faces, transparent_faces) = self.face_counts(grid, coord, slab);
        if solid_faces + transparent_faces == 0 {
            return None;
        }
        let origin = chunk_origin(coord.x, coord.z);
        let mut solid = std::mem::take(&mut self.solid);
        let mut transparent = std::mem::take(&mut self.transparent);
        solid.clear();
        transparent.clear();
        solid.reserve(solid_faces * VERTICES_PER_FACE);
        transparent.reserve(transparent_faces * VERTICES_PER_FACE);
        let mut bounds = Aabb::EMPTY;
        let sampler = CornerSampler {
            grid,
            origin,
            diagonals: self.diagonals,
        };

        self.for_each_face(grid, coord, slab, |cell, voxel, face| {
            let rgba = self.palette[voxel.material as usize].rgba;
            let out = if voxel.is_transparent() {
                &mut transparent
            } else {
                &mut solid
            };
            emit_face(&sampler, out, &mut bounds, cell, rgba, &FACES[face]);
        });

        let mesh = SlabMesh {
            slab,
            solid: solid.clone(),
            transparent: transparent.clone(),
            bounds,
        };
        self.solid = solid;
        self.transparent = transparent;
        Some(mesh)
    }

    /// Mesh every slab of a chunk, keeping only the non-empty ones.
    pub fn build_chunk(&mut self, grid: &VoxelGrid, coord: ChunkCoord) -> Vec<SlabMesh> {
        (0..SLABS_PER_CHUNK as u32)
            .filter_map(|slab| self.build_slab(grid, coord, slab))
            .collect()
    }
}

/// Light lookups for one chunk's faces.
struct CornerSampler<'a> {
    grid: &'a VoxelGrid,
    origin: IVec2,
    diagonals: bool,
}

impl CornerSampler<'_> {
    /// Whether the cell lies in a chunk the build was gated on.
    fn gated(&self, cell: IVec3) -> bool {
        if self.diagonals {
            return true;
        }
        let dx = (cell.x - self.origin.x).div_euclid(CHUNK_WIDTH);
        let dz = (cell.z - self.origin.y).div_euclid(CHUNK_WIDTH);
        dx == 0 || dz == 0
    }

    /// Average sun and local light over the usable samples, packed `sun << 4 | local`.
    fn corner_light(&self, samples: [IVec3; 4]) -> u8 {
        let (mut sun, mut local, mut count) = (0u32, 0u32, 0u32);
        for s in samples {
            if !VoxelGrid::in_height(s.y) || !self.gated(s) {
                continue;
            }
            let v = self.grid.get(s.x, s.y, s.z);
            sun += v.sunlight() as u32;
            local += v.local_light() as u32;
            count += 1;
        }
        if count == 0 {
            // face cell outside the world: sky above, dark below
            let v = self.grid.get(samples[0].x, samples[0].y, samples[0].z);
            return v.light;
        }
        let avg = |sum: u32| ((sum + count / 2) / count) as u8;
        pack_light(avg(sun), avg(local))
    }
}

fn emit_face(
    sampler: &CornerSampler,
    out: &mut Vec<MeshVertex>,
    bounds: &mut Aabb,
    cell: IVec3,
    rgba: [u8; 4],
    face: &FaceDef,
) {
    let normal = IVec3::from_array(face.normal);
    let front = cell + normal;
    // the two axes spanning the face
    let axis = face.normal.iter().position(|&c| c != 0).unwrap_or(0);
    let (ta, tb) = ((axis + 1) % 3, (axis + 2) % 3);
    let tint = sampler.grid.get(front.x, front.y, front.z).local_tint;
    let origin = sampler.origin;

    for corner in face.corners {
        let step = |t: usize| {
            let mut s = IVec3::ZERO;
            s[t] = if corner[t] == P { 1 } else { -1 };
            s
        };
        let (sa, sb) = (step(ta), step(tb));
        let light = sampler.corner_light([front, front + sa, front + sb, front + sa + sb]);

        let local = cell - IVec3::new(origin.x, 0, origin.y) + IVec3::from_array(corner);
        let position = local.as_vec3();
        bounds.include(position);
        out.push(MeshVertex {
            position: position.to_array(),
            normal: [normal.x as i8, normal.y as i8, normal.z as i8, 0],
            tex_coord: [corner[ta] as u16, corner[tb] as u16],
            color: rgba,
            light: [tint[0], tint[1], tint[2], light],
        });
    }
}
