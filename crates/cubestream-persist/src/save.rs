use cubestream_core::{ChunkCoord, Voxel};

use crate::compress;
use crate::format::*;

/// Serialize one chunk's voxels into a self-describing blob.
///
/// Layout: header (16B) + payload. Uniform chunks store a single voxel,
/// everything else an LZ4 block of the raw voxel bytes.
pub fn encode_chunk(coord: ChunkCoord, voxels: &[Voxel]) -> Vec<u8> {
    let (encoding, payload) = match compress::detect_fill(voxels) {
        Some(voxel) => (ENCODING_FILL, compress::encode_fill(voxel).to_vec()),
        None => (
            ENCODING_LZ4,
            compress::compress_chunk(bytemuck::cast_slice(voxels)),
        ),
    };

    let header = ChunkHeader::new(coord.x, coord.z, encoding);
    let mut output = Vec::with_capacity(HEADER_SIZE + payload.len());
    output.extend_from_slice(bytemuck::bytes_of(&header));
    output.extend_from_slice(&payload);
    output
}
