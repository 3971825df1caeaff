//! Per-chunk load-state bookkeeping.
//!
//! A chunk is the fixed-size contiguous block of row indices used as the
//! unit of fetch/cache accounting. State machine per chunk:
//! `Unloaded -> Loading -> {Loaded | Unloaded}`; a failed fetch returns the
//! chunk to `Unloaded` so the next visibility pass retries it.

/// Rows per fetch/cache chunk.
pub const CHUNK_SIZE: usize = 50;

/// Load state of one chunk. The `Loading` flag is the only re-entrancy
/// guard in the system: it is checked and set synchronously before the
/// fetch awaits, which is sufficient on a single-threaded event loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// Sparse array of chunk states; indices past the end read as `Unloaded`.
#[derive(Debug, Clone, Default)]
pub struct ChunkStates(Vec<ChunkState>);

impl ChunkStates {
    pub fn get(&self, chunk_id: usize) -> ChunkState {
        self.0.get(chunk_id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, chunk_id: usize, state: ChunkState) {
        if self.0.len() <= chunk_id {
            self.0.resize(chunk_id + 1, ChunkState::Unloaded);
        }
        if let Some(slot) = self.0.get_mut(chunk_id) {
            *slot = state;
        }
    }

    /// Reset a chunk to `Unloaded` (fetch failure, shifted rows).
    pub fn reset(&mut self, chunk_id: usize) {
        if let Some(slot) = self.0.get_mut(chunk_id) {
            *slot = ChunkState::Unloaded;
        }
    }

    /// Reset every chunk outside `[start_chunk, end_chunk]`.
    pub fn retain_range(&mut self, start_chunk: usize, end_chunk: usize) {
        for (i, slot) in self.0.iter_mut().enumerate() {
            if i < start_chunk || i > end_chunk {
                *slot = ChunkState::Unloaded;
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// True while any chunk is mid-flight.
    pub fn any_loading(&self) -> bool {
        self.0.iter().any(|s| *s == ChunkState::Loading)
    }
}

/// Chunk id owning an absolute row index.
pub fn chunk_index(row_index: usize) -> usize {
    row_index / CHUNK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_chunks_read_as_unloaded() {
        let states = ChunkStates::default();
        assert_eq!(states.get(7), ChunkState::Unloaded);
    }

    #[test]
    fn set_grows_sparse_array() {
        let mut states = ChunkStates::default();
        states.set(3, ChunkState::Loading);
        assert_eq!(states.get(3), ChunkState::Loading);
        assert_eq!(states.get(0), ChunkState::Unloaded);
        states.set(3, ChunkState::Loaded);
        assert_eq!(states.get(3), ChunkState::Loaded);
    }

    #[test]
    fn retain_range_resets_outside() {
        let mut states = ChunkStates::default();
        for i in 0..6 {
            states.set(i, ChunkState::Loaded);
        }
        states.retain_range(2, 4);
        assert_eq!(states.get(0), ChunkState::Unloaded);
        assert_eq!(states.get(2), ChunkState::Loaded);
        assert_eq!(states.get(4), ChunkState::Loaded);
        assert_eq!(states.get(5), ChunkState::Unloaded);
    }

    #[test]
    fn chunk_index_maps_rows() {
        assert_eq!(chunk_index(0), 0);
        assert_eq!(chunk_index(49), 0);
        assert_eq!(chunk_index(50), 1);
        assert_eq!(chunk_index(120), 2);
    }
}
