use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use cubestream_core::{ChunkCoord, Voxel};
use parking_lot::Mutex;

use crate::error::PersistError;
use crate::load::decode_chunk;
use crate::save::encode_chunk;

/// Persistent backing for chunk voxels.
///
/// `try_load` returns `Ok(None)` when nothing was saved for the chunk.
/// Callers treat errors as "regenerate", never as fatal.
pub trait ChunkStore: Send + Sync {
    fn try_load(&self, coord: ChunkCoord) -> Result<Option<Vec<Voxel>>, PersistError>;
    fn save(&self, coord: ChunkCoord, voxels: &[Voxel]) -> Result<(), PersistError>;
}

/// A store that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl ChunkStore for NullStore {
    fn try_load(&self, _coord: ChunkCoord) -> Result<Option<Vec<Voxel>>, PersistError> {
        Ok(None)
    }

    fn save(&self, _coord: ChunkCoord, _voxels: &[Voxel]) -> Result<(), PersistError> {
        Ok(())
    }
}

/// In-process store keeping encoded blobs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<(i32, i32), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Overwrite the raw blob for a chunk.
    pub fn insert_raw(&self, coord: ChunkCoord, blob: Vec<u8>) {
        self.blobs.lock().insert((coord.x, coord.z), blob);
    }
}

impl ChunkStore for MemoryStore {
    fn try_load(&self, coord: ChunkCoord) -> Result<Option<Vec<Voxel>>, PersistError> {
        let blobs = self.blobs.lock();
        match blobs.get(&(coord.x, coord.z)) {
            Some(blob) => decode_chunk(blob, coord).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, coord: ChunkCoord, voxels: &[Voxel]) -> Result<(), PersistError> {
        let blob = encode_chunk(coord, voxels);
        self.blobs.lock().insert((coord.x, coord.z), blob);
        Ok(())
    }
}

/// One file per chunk under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.root.join(format!("c.{}.{}.chunk", coord.x, coord.z))
    }
}

impl ChunkStore for DirectoryStore {
    fn try_load(&self, coord: ChunkCoord) -> Result<Option<Vec<Voxel>>, PersistError> {
        let bytes = match std::fs::read(self.chunk_path(coord)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_chunk(&bytes, coord).map(Some)
    }

    fn save(&self, coord: ChunkCoord, voxels: &[Voxel]) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.chunk_path(coord);
        let tmp = path.with_extension("chunk.tmp");
        std::fs::write(&tmp, encode_chunk(coord, voxels))?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("saved chunk ({}, {}) to {}", coord.x, coord.z, path.display());
        Ok(())
    }
}
