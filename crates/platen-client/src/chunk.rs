//! Chunking — splits a job file into bounded frames for streaming.

use bytes::Bytes;

use platen_core::wire::{chunk_count, CHUNK_SIZE};

/// One bounded fragment of a submission, tagged with its position in the
/// overall sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub sequence_index: u32,
    pub payload: Bytes,
    pub is_last: bool,
}

/// Lazy chunker over an in-memory source.
///
/// Yields chunks in strictly increasing `sequence_index` order starting at
/// 0, covering the source with no gaps or overlaps. Every chunk carries
/// exactly [`CHUNK_SIZE`] bytes except a possibly short final one. Slicing
/// a `Bytes` is a refcount bump — no payload is copied here, and the
/// session releases each slice right after transmission.
///
/// The sequence is finite and non-restartable; chunking the same immutable
/// source twice yields identical sequences. A zero-length source yields no
/// chunks at all — callers reject empty files before a session starts.
pub struct Chunker {
    source: Bytes,
    next_index: u32,
    total: u32,
}

impl Chunker {
    pub fn new(source: Bytes) -> Self {
        let total = chunk_count(source.len() as u64);
        Self {
            source,
            next_index: 0,
            total,
        }
    }

    /// Total number of chunks this source splits into.
    pub fn total(&self) -> u32 {
        self.total
    }
}

impl Iterator for Chunker {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next_index >= self.total {
            return None;
        }
        let start = self.next_index as usize * CHUNK_SIZE;
        let end = (start + CHUNK_SIZE).min(self.source.len());
        let chunk = Chunk {
            sequence_index: self.next_index,
            payload: self.source.slice(start..end),
            is_last: self.next_index + 1 == self.total,
        };
        self.next_index += 1;
        Some(chunk)
    }
}
