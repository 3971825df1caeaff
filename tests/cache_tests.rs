//! Row/chunk cache behavior through the public loader API.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use common::{block_on, FakeSource};
use gridview::cache::{chunk_index, ChunkState, RowLoader, CHUNK_SIZE};
use gridview::cache::fetch::{BUFFER_SIZE, PREFETCH_THRESHOLD};
use gridview::types::Slice;
use std::rc::Rc;

fn loader(total: usize) -> (Rc<FakeSource>, RowLoader) {
    let source = FakeSource::new();
    let loader = RowLoader::new(source.clone(), Vec::new(), None);
    loader.cache_mut().set_total_rows(total);
    (source, loader)
}

#[test]
fn eviction_containment_after_visibility_update() {
    let (_, loader) = loader(5_000);
    {
        let mut cache = loader.cache_mut();
        for i in 0..2_000 {
            cache.insert(gridview::types::Row::new(i, gridview::types::RowValues::new()));
        }
    }
    let slice = Slice::new(900, 930);
    loader.update_visible_rows(slice, 0.0);

    let cache = loader.cache();
    for (&index, _) in cache.iter() {
        assert!(
            index >= slice.start - BUFFER_SIZE && index <= slice.end + BUFFER_SIZE,
            "index {index} escaped the eviction window"
        );
    }
}

#[test]
fn chunk_coverage_at_the_moment_of_loading() {
    let (_, loader) = loader(1_000);
    let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
    block_on(loader.dispatch(runs));

    let cache = loader.cache();
    for chunk in 0..20 {
        if cache.chunk_states.get(chunk) == ChunkState::Loaded {
            let start = chunk * CHUNK_SIZE;
            let end = ((chunk + 1) * CHUNK_SIZE).min(cache.total_rows());
            for i in start..end {
                assert!(cache.contains(i), "chunk {chunk} loaded but row {i} missing");
            }
        }
    }
}

#[test]
fn scroll_down_requests_covering_chunks_only() {
    // CHUNK_SIZE = 50, totalRows = 1000, visible slice [120, 150).
    let (source, loader) = loader(1_000);
    loader.update_visible_rows(Slice::new(60, 90), 0.0);
    source.row_queries.borrow_mut().clear();

    let runs = loader.update_visible_rows(Slice::new(120, 150), 1_000.0);
    block_on(loader.dispatch(runs));

    let queries = source.row_queries.borrow();
    assert_eq!(queries.len(), 1);
    // Chunks 2 and 3 coalesce into one call; 150 % 50 = 0 is not within
    // the prefetch threshold of the next chunk edge, so chunk 4 stays out.
    assert_eq!(queries[0].offset, 100);
    assert_eq!(queries[0].limit, 100);
    assert_eq!(chunk_index(queries[0].offset + queries[0].limit - 1), 3);
}

#[test]
fn prefetch_threshold_pulls_one_chunk_ahead() {
    let (source, loader) = loader(1_000);
    loader.update_visible_rows(Slice::new(0, 30), 0.0);
    source.row_queries.borrow_mut().clear();

    // end = 148: 148 % 50 = 48 > 50 - PREFETCH_THRESHOLD → chunk 3 joins.
    assert!(48 > CHUNK_SIZE - PREFETCH_THRESHOLD);
    let runs = loader.update_visible_rows(Slice::new(118, 148), 1_000.0);
    block_on(loader.dispatch(runs));

    let queries = source.row_queries.borrow();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].offset, 100);
    assert_eq!(queries[0].limit, 100);
}

#[test]
fn failed_fetch_resets_state_and_retries_on_next_pass() {
    let source = FakeSource::failing_rows();
    let loader = RowLoader::new(source.clone(), Vec::new(), None);
    loader.cache_mut().set_total_rows(1_000);

    let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
    assert!(!runs.is_empty());
    block_on(loader.dispatch(runs));
    assert_eq!(loader.cache().chunk_states.get(2), ChunkState::Unloaded);

    // The same window becomes wanted again on the next visibility pass.
    let retry = loader.update_visible_rows(Slice::new(120, 150), 1_000.0);
    assert!(!retry.is_empty());
}

#[test]
fn throttle_drops_passes_within_the_window() {
    let (_, loader) = loader(1_000);
    let first = loader.update_visible_rows(Slice::new(0, 30), 0.0);
    assert!(!first.is_empty());
    // A different window inside the throttle interval plans nothing.
    let second = loader.update_visible_rows(Slice::new(400, 430), 50.0);
    assert!(second.is_empty());
}

#[test]
fn rows_are_keyed_by_their_reported_index() {
    let (_, loader) = loader(1_000);
    let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
    block_on(loader.dispatch(runs));

    let cache = loader.cache();
    let row = cache.get(120).unwrap();
    assert_eq!(row.meta.row_index, 120);
    assert_eq!(
        row.data.get("title").and_then(|v| v.as_str()),
        Some("row 120")
    );
}
