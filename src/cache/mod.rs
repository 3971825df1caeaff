//! Sparse row/group caches with chunked, prefetching remote loads.

pub mod chunks;
pub mod fetch;
pub mod groups;
pub mod rows;

pub use chunks::{chunk_index, ChunkState, ChunkStates, CHUNK_SIZE};
pub use fetch::{ChunkRun, RowLoader, Throttle};
pub use groups::{
    build_nested_where, generate_group_path, group_chunk_index, AncestorFilter, GroupByColumn,
    GroupChildren, GroupLayoutParams, GroupLoader, GroupNode, GroupRange, GroupTreeCache,
    GroupValue, ADD_ROW_HEIGHT, GROUP_CHUNK_SIZE, GROUP_EXPANDED_BOTTOM_PADDING,
    GROUP_HEADER_HEIGHT, GROUP_PADDING, MAX_GROUP_CACHE_SIZE,
};
pub use rows::RowCache;
