//! Fixed-size chunking of blob payloads

use bytes::Bytes;

/// Default chunk size (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// One zero-based, ordered slice of a payload.
///
/// `data` shares the payload's buffer; no bytes are copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub data: Bytes,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Number of chunks `len` bytes split into.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Split `payload` into `chunk_size` slices; only the last may be shorter.
///
/// An empty payload yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero. [`crate::StorageConfig::validate`] and
/// [`crate::compute_blob_tree`] reject that before splitting.
pub fn split(payload: &Bytes, chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");

    (0..chunk_count(payload.len(), chunk_size))
        .map(|index| {
            let start = index * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            Chunk {
                index,
                data: payload.slice(start..end),
            }
        })
        .collect()
}
