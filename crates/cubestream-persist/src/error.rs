/// Errors that can occur while reading or writing persisted chunks.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid magic bytes (expected CSCK)")]
    InvalidMagic,

    #[error("unsupported chunk format version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown chunk encoding {0}")]
    UnknownEncoding(u16),

    #[error("blob too small ({0} bytes, minimum {1})")]
    BlobTooSmall(usize, usize),

    #[error("LZ4 decompression failed: {0}")]
    DecompressError(String),

    #[error("invalid chunk size: expected {expected}, got {actual}")]
    InvalidChunkSize { expected: usize, actual: usize },

    #[error("invalid fill chunk data (expected {0} bytes)")]
    InvalidFillChunk(usize),

    #[error("blob holds chunk ({found_x}, {found_z}), expected ({x}, {z})")]
    CoordMismatch {
        x: i32,
        z: i32,
        found_x: i32,
        found_z: i32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
