use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::mesh::MeshVertex;

/// Opaque id of an uploaded vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Where finished slab geometry goes. Called from the control thread only.
pub trait VertexUploader: Send {
    fn upload_vertices(&mut self, vertices: &[MeshVertex]) -> BufferHandle;
    fn release(&mut self, handle: BufferHandle);
}

/// Shared view of a [`MemoryUploader`]'s live buffers.
pub type BufferMap = Arc<Mutex<HashMap<BufferHandle, Vec<MeshVertex>>>>;

/// Keeps uploaded vertices in memory. Used headless and in tests.
#[derive(Default)]
pub struct MemoryUploader {
    next: u64,
    buffers: BufferMap,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle on the live buffer set, readable after the uploader moves into a world.
    pub fn buffers(&self) -> BufferMap {
        self.buffers.clone()
    }
}

impl VertexUploader for MemoryUploader {
    fn upload_vertices(&mut self, vertices: &[MeshVertex]) -> BufferHandle {
        self.next += 1;
        let handle = BufferHandle(self.next);
        self.buffers.lock().insert(handle, vertices.to_vec());
        handle
    }

    fn release(&mut self, handle: BufferHandle) {
        if self.buffers.lock().remove(&handle).is_none() {
            log::warn!("released unknown buffer {:?}", handle);
        }
    }
}
