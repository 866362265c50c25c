use std::sync::Arc;

use cubestream_core::{ChunkCoord, ConfigError, WrapIndexer};

use crate::chunk::Chunk;

/// Toroidal spatial index over resident chunks.
///
/// Each wrapped slot holds at most one chunk. Storing into an occupied slot
/// evicts the occupant, which bounds memory to the index size no matter how
/// far the observer travels. Owned by the control thread.
pub struct ChunkStorage {
    slots: Vec<Option<Arc<Chunk>>>,
    indexer: WrapIndexer,
    /// Flat list of resident chunks, for iteration and distance sorting.
    resident: Vec<Arc<Chunk>>,
    added_since_sort: bool,
}

impl ChunkStorage {
    pub fn new(width: usize) -> Result<Self, ConfigError> {
        let indexer = WrapIndexer::new(width)?;
        Ok(Self {
            slots: vec![None; width * width],
            indexer,
            resident: Vec::new(),
            added_since_sort: false,
        })
    }

    pub fn width(&self) -> usize {
        self.indexer.size()
    }

    fn slot(&self, coord: ChunkCoord) -> usize {
        self.indexer.index_2d(coord.x, coord.z)
    }

    /// Insert a chunk, returning the evicted occupant of its slot if any.
    pub fn store(&mut self, chunk: Arc<Chunk>) -> Option<Arc<Chunk>> {
        let slot = self.slot(chunk.coord());
        let evicted = self.slots[slot].take();
        if let Some(old) = &evicted {
            debug_assert_ne!(
                old.coord(),
                chunk.coord(),
                "chunk stored twice at the same coordinate"
            );
            self.resident.retain(|c| !Arc::ptr_eq(c, old));
        }
        self.resident.push(chunk.clone());
        self.slots[slot] = Some(chunk);
        self.added_since_sort = true;
        evicted
    }

    /// The resident chunk at exactly `coord`, ignoring aliased occupants.
    pub fn get(&self, coord: ChunkCoord) -> Option<&Arc<Chunk>> {
        self.slots[self.slot(coord)]
            .as_ref()
            .filter(|c| c.coord() == coord)
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        let slot = self.slot(coord);
        if self.slots[slot].as_ref().is_some_and(|c| c.coord() == coord) {
            let chunk = self.slots[slot].take()?;
            self.resident.retain(|c| !Arc::ptr_eq(c, &chunk));
            return Some(chunk);
        }
        None
    }

    pub fn resident(&self) -> &[Arc<Chunk>] {
        &self.resident
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn added_since_sort(&self) -> bool {
        self.added_since_sort
    }

    /// Order the resident list nearest-first.
    pub fn sort_by_distance(&mut self, center: ChunkCoord) {
        self.resident
            .sort_by_key(|c| c.coord().distance_squared(&center));
        self.added_since_sort = false;
    }

    /// Remove every chunk, returning them.
    pub fn drain(&mut self) -> Vec<Arc<Chunk>> {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.added_since_sort = false;
        std::mem::take(&mut self.resident)
    }
}
