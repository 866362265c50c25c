use cubestream_core::constants::VOXEL_BYTES;
use cubestream_core::{ChunkCoord, Voxel};

use crate::compat;
use crate::compress;
use crate::error::PersistError;
use crate::format::*;

/// Parse a chunk blob produced by [`crate::save::encode_chunk`].
pub fn decode_chunk(bytes: &[u8], expected: ChunkCoord) -> Result<Vec<Voxel>, PersistError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PersistError::BlobTooSmall(bytes.len(), HEADER_SIZE));
    }

    let header: ChunkHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
    compat::validate_header(&header, expected)?;

    let payload = &bytes[HEADER_SIZE..];
    if header.encoding == ENCODING_FILL {
        return compress::expand_fill(payload);
    }

    let raw = compress::decompress_chunk(payload)?;
    debug_assert_eq!(raw.len() % VOXEL_BYTES, 0);
    Ok(bytemuck::cast_slice::<u8, Voxel>(&raw).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::encode_chunk;
    use cubestream_core::constants::VOXELS_PER_CHUNK;

    fn sample_chunk() -> Vec<Voxel> {
        (0..VOXELS_PER_CHUNK)
            .map(|i| {
                let mut v = Voxel::new((i % 5) as u8, if i % 5 == 0 { 0 } else { 15 });
                v.set_sunlight((i % 16) as u8);
                v
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_mixed_chunk() {
        let coord = ChunkCoord::new(12, -7, 1024);
        let voxels = sample_chunk();
        let blob = encode_chunk(coord, &voxels);
        let decoded = decode_chunk(&blob, coord).expect("decode should succeed");
        assert_eq!(decoded, voxels);
    }

    #[test]
    fn test_roundtrip_fill_chunk() {
        let coord = ChunkCoord::new(0, 0, 1024);
        let voxels = vec![Voxel::SKY; VOXELS_PER_CHUNK];
        let decoded = decode_chunk(&encode_chunk(coord, &voxels), coord).expect("decode");
        assert_eq!(decoded, voxels);
    }

    #[test]
    fn test_too_small_rejected() {
        let coord = ChunkCoord::new(0, 0, 1024);
        assert!(matches!(
            decode_chunk(&[0u8; 5], coord),
            Err(PersistError::BlobTooSmall(5, HEADER_SIZE))
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let coord = ChunkCoord::new(1, 1, 1024);
        let blob = encode_chunk(coord, &sample_chunk());
        let truncated = &blob[..blob.len() / 2];
        assert!(decode_chunk(truncated, coord).is_err());
    }

    #[test]
    fn test_wrong_coord_rejected() {
        let blob = encode_chunk(ChunkCoord::new(1, 1, 1024), &sample_chunk());
        assert!(matches!(
            decode_chunk(&blob, ChunkCoord::new(1, 2, 1024)),
            Err(PersistError::CoordMismatch { .. })
        ));
    }
}
