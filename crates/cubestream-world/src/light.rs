//! Sunlight propagation over the shared voxel grid.
//!
//! A chunk is lit with one top-down sweep: seed the top layer from the sky,
//! then relax each lower layer from the cell above and the four lateral
//! neighbors. Cells across the chunk seam are raised in place as the sweep
//! passes them, so light leaks into already-loaded neighbors without a second
//! pass. Light that would have to travel upward (under overhangs, into caves)
//! is not found; the sweep is an approximation, not a full flood fill.

use cubestream_core::constants::{CHUNK_WIDTH, MAX_LIGHT, WORLD_HEIGHT};
use cubestream_core::ChunkCoord;

use crate::grid::VoxelGrid;

const LATERAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Light one chunk. Only ever raises sunlight values.
pub fn propagate_sunlight(grid: &mut VoxelGrid, coord: ChunkCoord) {
    let x0 = coord.x * CHUNK_WIDTH;
    let z0 = coord.z * CHUNK_WIDTH;
    let top = WORLD_HEIGHT - 1;

    for x in x0..x0 + CHUNK_WIDTH {
        for z in z0..z0 + CHUNK_WIDTH {
            let cell = grid.get(x, top, z);
            let level = MAX_LIGHT.saturating_sub(cell.opacity);
            if level > cell.sunlight() {
                grid.set_sunlight(x, top, z, level);
            }
        }
    }

    for y in (0..top).rev() {
        for x in x0..x0 + CHUNK_WIDTH {
            for z in z0..z0 + CHUNK_WIDTH {
                let level = relax(grid, x, y, z);
                let Some(level) = level else { continue };
                for (dx, dz) in LATERAL {
                    let (nx, nz) = (x + dx, z + dz);
                    let inside = (x0..x0 + CHUNK_WIDTH).contains(&nx)
                        && (z0..z0 + CHUNK_WIDTH).contains(&nz);
                    if !inside {
                        raise(grid, nx, y, nz, level.saturating_sub(1));
                    }
                }
            }
        }
    }
}

/// Raise one transparent cell from its surroundings. Returns its resulting
/// level, or None for opaque cells.
fn relax(grid: &mut VoxelGrid, x: i32, y: i32, z: i32) -> Option<u8> {
    let cell = grid.get(x, y, z);
    if !cell.is_transparent() {
        return None;
    }
    let level = gather(grid, x, y, z).saturating_sub(cell.opacity);
    if level > cell.sunlight() {
        grid.set_sunlight(x, y, z, level);
        return Some(level);
    }
    Some(cell.sunlight())
}

/// Best incoming light: straight down from above, or sideways with one step of falloff.
fn gather(grid: &VoxelGrid, x: i32, y: i32, z: i32) -> u8 {
    LATERAL.iter().fold(grid.sunlight(x, y + 1, z), |best, &(dx, dz)| {
        best.max(grid.sunlight(x + dx, y, z + dz).saturating_sub(1))
    })
}

fn raise(grid: &mut VoxelGrid, x: i32, y: i32, z: i32, incoming: u8) {
    let cell = grid.get(x, y, z);
    if !cell.is_transparent() {
        return;
    }
    let level = incoming.saturating_sub(cell.opacity);
    if level > cell.sunlight() {
        grid.set_sunlight(x, y, z, level);
    }
}

/// Recompute one column after an edit. Unlike the chunk sweep this may
/// lower values, so placing an opaque cell shades the column beneath it.
pub fn relight_column(grid: &mut VoxelGrid, x: i32, z: i32) {
    for y in (0..WORLD_HEIGHT).rev() {
        let cell = grid.get(x, y, z);
        let level = if cell.is_transparent() {
            gather(grid, x, y, z).saturating_sub(cell.opacity)
        } else {
            0
        };
        grid.set_sunlight(x, y, z, level);
        for (dx, dz) in LATERAL {
            raise(grid, x + dx, y, z + dz, level.saturating_sub(1));
        }
    }
}
