use cubestream_core::ChunkCoord;

use crate::error::PersistError;
use crate::format::{ChunkHeader, ENCODING_FILL, ENCODING_LZ4, FORMAT_VERSION, MAGIC};

/// Validate a chunk header against the chunk the caller asked for.
pub fn validate_header(header: &ChunkHeader, expected: ChunkCoord) -> Result<(), PersistError> {
    if header.magic != MAGIC {
        return Err(PersistError::InvalidMagic);
    }

    if header.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(header.version));
    }

    if header.encoding != ENCODING_LZ4 && header.encoding != ENCODING_FILL {
        return Err(PersistError::UnknownEncoding(header.encoding));
    }

    // A blob copied between slots (or written under another wrap distance)
    // would silently land in the wrong place.
    if header.x != expected.x || header.z != expected.z {
        return Err(PersistError::CoordMismatch {
            x: expected.x,
            z: expected.z,
            found_x: header.x,
            found_z: header.z,
        });
    }

    Ok(())
}
