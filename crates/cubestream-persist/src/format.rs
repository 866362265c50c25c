use cubestream_core::constants::{BYTES_PER_CHUNK, VOXEL_BYTES};

/// Magic bytes identifying a persisted chunk blob.
pub const MAGIC: [u8; 4] = *b"CSCK";

/// Current chunk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the blob header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Payload is an LZ4 size-prepended block of raw voxel bytes.
pub const ENCODING_LZ4: u16 = 0;

/// Payload is a single voxel repeated over the whole chunk.
pub const ENCODING_FILL: u16 = 1;

/// Expected decompressed chunk size in bytes.
pub const CHUNK_DATA_SIZE: usize = BYTES_PER_CHUNK;

/// Size of a fill payload.
pub const FILL_SIZE: usize = VOXEL_BYTES;

/// Per-chunk blob header. Fixed 16 bytes, repr(C) for byte-level serialization.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub encoding: u16,
    pub x: i32,
    pub z: i32,
}

impl ChunkHeader {
    pub fn new(x: i32, z: i32, encoding: u16) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            encoding,
            x,
            z,
        }
    }
}
