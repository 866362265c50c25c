use cubestream_core::constants::VOXELS_PER_CHUNK;
use cubestream_core::Voxel;

use crate::error::PersistError;
use crate::format::{CHUNK_DATA_SIZE, FILL_SIZE};

/// Compress a chunk's raw voxel bytes using LZ4.
pub fn compress_chunk(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress an LZ4-compressed chunk, validating the output size.
///
/// The size prefix is checked before anything is allocated, so a corrupt
/// blob cannot ask for more than one chunk's worth of memory.
pub fn decompress_chunk(compressed: &[u8]) -> Result<Vec<u8>, PersistError> {
    let (size, block) = lz4_flex::block::uncompressed_size(compressed)
        .map_err(|e| PersistError::DecompressError(e.to_string()))?;
    if size != CHUNK_DATA_SIZE {
        return Err(PersistError::InvalidChunkSize {
            expected: CHUNK_DATA_SIZE,
            actual: size,
        });
    }

    let decompressed = lz4_flex::block::decompress(block, size)
        .map_err(|e| PersistError::DecompressError(e.to_string()))?;
    if decompressed.len() != CHUNK_DATA_SIZE {
        return Err(PersistError::InvalidChunkSize {
            expected: CHUNK_DATA_SIZE,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

/// Returns the shared voxel if every voxel in the chunk is identical.
pub fn detect_fill(voxels: &[Voxel]) -> Option<Voxel> {
    let (first, rest) = voxels.split_first()?;
    rest.iter().all(|v| v == first).then_some(*first)
}

/// Encode a fill payload: the repeated voxel's raw bytes.
pub fn encode_fill(voxel: Voxel) -> [u8; FILL_SIZE] {
    let mut buf = [0u8; FILL_SIZE];
    buf.copy_from_slice(bytemuck::bytes_of(&voxel));
    buf
}

/// Expand a fill payload back to a full chunk.
pub fn expand_fill(data: &[u8]) -> Result<Vec<Voxel>, PersistError> {
    if data.len() != FILL_SIZE {
        return Err(PersistError::InvalidFillChunk(FILL_SIZE));
    }
    let voxel: Voxel = bytemuck::pod_read_unaligned(data);
    Ok(vec![voxel; VOXELS_PER_CHUNK])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_roundtrip() {
        let mut data = vec![0u8; CHUNK_DATA_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let compressed = compress_chunk(&data);
        let decompressed = decompress_chunk(&compressed).expect("decompress should succeed");
        assert_eq!(data, decompressed);
    }

    #[test]
    fn test_decompress_rejects_wrong_size() {
        let compressed = compress_chunk(&[1, 2, 3]);
        assert!(matches!(
            decompress_chunk(&compressed),
            Err(PersistError::InvalidChunkSize { actual: 3, .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_oversized_prefix() {
        let mut forged = u32::MAX.to_le_bytes().to_vec();
        forged.extend_from_slice(&[0x10, 0xAB, 0xCD]);
        assert!(matches!(
            decompress_chunk(&forged),
            Err(PersistError::InvalidChunkSize { actual, .. }) if actual == u32::MAX as usize
        ));
        assert!(matches!(
            decompress_chunk(&[1, 2]),
            Err(PersistError::DecompressError(_))
        ));
    }

    #[test]
    fn test_fill_detection() {
        let mut voxels = vec![Voxel::new(1, 15); VOXELS_PER_CHUNK];
        assert_eq!(detect_fill(&voxels), Some(Voxel::new(1, 15)));
        voxels[100].set_sunlight(3);
        assert_eq!(detect_fill(&voxels), None);
        assert_eq!(detect_fill(&[]), None);
    }

    #[test]
    fn test_fill_expand() {
        let mut v = Voxel::new(4, 15);
        v.local_tint = [1, 2, 3];
        let expanded = expand_fill(&encode_fill(v)).expect("expand should succeed");
        assert_eq!(expanded.len(), VOXELS_PER_CHUNK);
        assert!(expanded.iter().all(|e| *e == v));
        assert!(matches!(
            expand_fill(&[0, 0]),
            Err(PersistError::InvalidFillChunk(_))
        ));
    }

    #[test]
    fn test_compressed_size_sanity() {
        let data = vec![0u8; CHUNK_DATA_SIZE];
        let compressed = compress_chunk(&data);
        assert!(
            compressed.len() < CHUNK_DATA_SIZE / 10,
            "all-zero data should compress to <10% of original (got {} bytes)",
            compressed.len()
        );
    }
}
