//! Batched, throttled, prefetching chunk loads for one dataset.
//!
//! Scroll events call [`RowLoader::update_visible_rows`] with the new row
//! slice; it evicts stale rows, works out which chunks the viewport (plus a
//! direction-aware lookahead) needs, and (at most once per throttle
//! interval) turns them into maximal contiguous runs so N small requests
//! become a few large ones. The async half ([`RowLoader::dispatch`]) drives
//! the actual network calls and is spawned on the event loop by the viewer.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use super::chunks::{chunk_index, ChunkState, CHUNK_SIZE};
use super::rows::RowCache;
use crate::datasource::{DataSource, RowQuery};
use crate::error::{log_error, Result};
use crate::types::Slice;

/// Larger "above the fold" burst used for the very first chunk.
pub const INITIAL_LOAD_SIZE: usize = 100;
/// Rows kept on either side of the visible slice before eviction.
pub const BUFFER_SIZE: usize = 100;
/// Distance (rows) from a chunk edge at which the next chunk is prefetched.
pub const PREFETCH_THRESHOLD: usize = 10;
/// Upper bound on rows in a single coalesced network call.
pub const MAX_RECORDS_PER_CALL: usize = 200;
/// Minimum interval between dispatches (leading edge).
pub const API_THROTTLE_MS: f64 = 200.0;

/// Leading-edge rate limiter: the first call in a window runs, later calls
/// in the same window are dropped (the next scroll event retries).
#[derive(Debug, Default)]
pub struct Throttle {
    interval_ms: f64,
    last_run: Cell<Option<f64>>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_run: Cell::new(None),
        }
    }

    pub fn ready(&self, now_ms: f64) -> bool {
        match self.last_run.get() {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_run.set(Some(now_ms));
                true
            }
        }
    }
}

/// An inclusive run of chunk ids fetched in one network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRun {
    pub first: usize,
    pub last: usize,
    /// Route through the initial-load burst (chunk 0 only).
    pub initial: bool,
}

impl ChunkRun {
    fn len(&self) -> usize {
        self.last - self.first + 1
    }
}

/// Group wanted chunk ids into maximal contiguous runs, splitting any run
/// that would exceed `MAX_RECORDS_PER_CALL` and peeling chunk 0 off into
/// the initial-load path (which covers chunks 0 and 1 in one burst).
pub fn plan_chunk_runs(wanted: &BTreeSet<usize>) -> Vec<ChunkRun> {
    let max_chunks = MAX_RECORDS_PER_CALL / CHUNK_SIZE;
    let mut runs: Vec<ChunkRun> = Vec::new();

    let mut iter = wanted.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };

    let mut run_start = first;
    let mut prev = first;
    let flush = |start: usize, end: usize, runs: &mut Vec<ChunkRun>| {
        let mut start = start;
        if start == 0 {
            let initial_end = end.min(1);
            runs.push(ChunkRun {
                first: 0,
                last: initial_end,
                initial: true,
            });
            if end <= 1 {
                return;
            }
            start = initial_end + 1;
        }
        while start <= end {
            let last = (start + max_chunks - 1).min(end);
            runs.push(ChunkRun {
                first: start,
                last,
                initial: false,
            });
            start = last + 1;
        }
    };

    for id in iter {
        if id != prev + 1 {
            flush(run_start, prev, &mut runs);
            run_start = id;
        }
        prev = id;
    }
    flush(run_start, prev, &mut runs);
    runs
}

/// Chunked loader for one dataset (the root table or a single leaf group).
pub struct RowLoader {
    cache: RefCell<RowCache>,
    source: Rc<dyn DataSource>,
    /// Leaf-group path of this dataset; empty for the root table.
    path: Vec<usize>,
    /// Nested group filter sent with every row request.
    where_clause: RefCell<Option<String>>,
    throttle: Throttle,
    prev_slice: Cell<Slice>,
}

impl RowLoader {
    pub fn new(source: Rc<dyn DataSource>, path: Vec<usize>, where_clause: Option<String>) -> Self {
        Self {
            cache: RefCell::new(RowCache::default()),
            source,
            path,
            where_clause: RefCell::new(where_clause),
            throttle: Throttle::new(API_THROTTLE_MS),
            prev_slice: Cell::new(Slice::default()),
        }
    }

    pub fn cache(&self) -> std::cell::Ref<'_, RowCache> {
        self.cache.borrow()
    }

    pub fn cache_mut(&self) -> std::cell::RefMut<'_, RowCache> {
        self.cache.borrow_mut()
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn set_where_clause(&self, where_clause: Option<String>) {
        *self.where_clause.borrow_mut() = where_clause;
    }

    /// React to a new visible row slice: evict rows outside the buffer
    /// window, infer scroll direction, add the one-chunk lookahead, and,
    /// throttle permitting, return the coalesced fetch plan. The caller
    /// must pass every returned run to [`Self::dispatch`].
    pub fn update_visible_rows(&self, slice: Slice, now_ms: f64) -> Vec<ChunkRun> {
        let prev = self.prev_slice.get();
        self.prev_slice.set(slice);
        let scrolling_down = slice.start >= prev.start;

        let mut cache = self.cache.borrow_mut();
        cache.evict_outside(slice.start.saturating_sub(BUFFER_SIZE), slice.end + BUFFER_SIZE);

        let total = cache.total_rows();
        let last_chunk = if total == 0 {
            usize::MAX
        } else {
            chunk_index(total - 1)
        };

        let first_needed = chunk_index(slice.start);
        let last_needed = chunk_index(slice.end).min(last_chunk);

        let mut candidates: BTreeSet<usize> = (first_needed..=last_needed).collect();
        if scrolling_down {
            if slice.end % CHUNK_SIZE > CHUNK_SIZE - PREFETCH_THRESHOLD {
                candidates.insert((last_needed + 1).min(last_chunk));
            }
        } else if slice.start % CHUNK_SIZE < PREFETCH_THRESHOLD {
            candidates.insert(first_needed.saturating_sub(1));
        }

        let wanted: BTreeSet<usize> = candidates
            .into_iter()
            .filter(|&id| match cache.chunk_states.get(id) {
                ChunkState::Loading => false,
                ChunkState::Loaded => cache.chunk_missing(id),
                ChunkState::Unloaded => true,
            })
            .collect();

        if wanted.is_empty() || !self.throttle.ready(now_ms) {
            return Vec::new();
        }

        let runs = plan_chunk_runs(&wanted);
        // Mark everything Loading before the caller's first await so a
        // re-entrant visibility pass cannot double-request these chunks.
        for run in &runs {
            for id in run.first..=run.last {
                cache.chunk_states.set(id, ChunkState::Loading);
            }
        }
        runs
    }

    /// Drive every planned run to completion. Failed runs log and revert to
    /// `Unloaded` for retry on the next visibility pass; the caller
    /// requests a re-render once all calls have settled.
    pub async fn dispatch(&self, runs: Vec<ChunkRun>) {
        for run in runs {
            let result = if run.initial {
                self.fetch_initial(run).await
            } else {
                self.fetch_run(run).await
            };
            if let Err(err) = result {
                log_error("chunk fetch failed", &err);
                let mut cache = self.cache.borrow_mut();
                for id in run.first..=run.last {
                    cache.chunk_states.reset(id);
                }
            }
        }
    }

    /// Fetch a single chunk outside the batched path (keyboard jumps,
    /// programmatic row access). No-op while the chunk is `Loading`, or
    /// `Loaded` with all rows still present.
    pub async fn fetch_chunk(&self, chunk_id: usize, is_initial_load: bool) -> Result<()> {
        {
            let cache = self.cache.borrow();
            match cache.chunk_states.get(chunk_id) {
                ChunkState::Loading => return Ok(()),
                ChunkState::Loaded if !cache.chunk_missing(chunk_id) => return Ok(()),
                _ => {}
            }
        }
        let run = ChunkRun {
            first: chunk_id,
            last: if is_initial_load && chunk_id == 0 { 1 } else { chunk_id },
            initial: is_initial_load && chunk_id == 0,
        };
        {
            let mut cache = self.cache.borrow_mut();
            for id in run.first..=run.last {
                cache.chunk_states.set(id, ChunkState::Loading);
            }
        }
        let result = if run.initial {
            self.fetch_initial(run).await
        } else {
            self.fetch_run(run).await
        };
        if let Err(err) = result {
            log_error("chunk fetch failed", &err);
            let mut cache = self.cache.borrow_mut();
            for id in run.first..=run.last {
                cache.chunk_states.reset(id);
            }
        }
        Ok(())
    }

    /// Fetch rows covering [`slice.start`, `slice.end`) and wait for them.
    pub async fn fetch_missing(&self, start: usize, end: usize) -> Result<()> {
        let first = chunk_index(start);
        let last = chunk_index(end.saturating_sub(1).max(start));
        for id in first..=last {
            self.fetch_chunk(id, false).await?;
        }
        Ok(())
    }

    async fn fetch_initial(&self, run: ChunkRun) -> Result<()> {
        let query = RowQuery {
            offset: 0,
            limit: INITIAL_LOAD_SIZE,
            where_clause: self.where_clause.borrow().clone(),
            path: self.path.clone(),
        };
        let rows = self.source.load_rows(query, true).await?;
        let mut cache = self.cache.borrow_mut();
        for row in rows {
            cache.insert(row);
        }
        for id in run.first..=run.last {
            cache.chunk_states.set(id, ChunkState::Loaded);
        }
        Ok(())
    }

    async fn fetch_run(&self, run: ChunkRun) -> Result<()> {
        let query = RowQuery {
            offset: run.first * CHUNK_SIZE,
            limit: run.len() * CHUNK_SIZE,
            where_clause: self.where_clause.borrow().clone(),
            path: self.path.clone(),
        };
        let rows = self.source.load_rows(query, false).await?;
        let mut cache = self.cache.borrow_mut();
        for row in rows {
            cache.insert(row);
        }
        for id in run.first..=run.last {
            cache.chunk_states.set(id, ChunkState::Loaded);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::datasource::{GroupPage, GroupQuery, LocalFuture};
    use crate::error::GridError;
    use crate::types::{Row, RowValues};
    use std::cell::RefCell as StdRefCell;

    /// Polls ready-made futures to completion; the fakes never suspend.
    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
        let mut fut = std::pin::pin!(fut);
        loop {
            if let std::task::Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
                return out;
            }
        }
    }

    /// Serves rows by index, recording every query; optionally fails.
    struct FakeSource {
        queries: StdRefCell<Vec<RowQuery>>,
        fail: bool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                queries: StdRefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                queries: StdRefCell::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl DataSource for FakeSource {
        fn load_rows(
            &self,
            query: RowQuery,
            _show_loading: bool,
        ) -> LocalFuture<'_, Result<Vec<Row>>> {
            self.queries.borrow_mut().push(query.clone());
            let out = if self.fail {
                Err(GridError::DataSource("boom".to_string()))
            } else {
                Ok((query.offset..query.offset + query.limit)
                    .map(|i| Row::new(i, RowValues::new()))
                    .collect())
            };
            Box::pin(std::future::ready(out))
        }

        fn load_groups(&self, _query: GroupQuery) -> LocalFuture<'_, Result<GroupPage>> {
            Box::pin(std::future::ready(Ok(GroupPage::default())))
        }

        fn related_display_column(
            &self,
            _column_id: &str,
        ) -> LocalFuture<'_, Result<Option<String>>> {
            Box::pin(std::future::ready(Ok(None)))
        }

        fn move_row(
            &self,
            _row_index: usize,
            _before: Option<usize>,
            _path: &[usize],
        ) -> LocalFuture<'_, Result<()>> {
            Box::pin(std::future::ready(Ok(())))
        }
    }

    fn loader_with_total(source: Rc<FakeSource>, total: usize) -> RowLoader {
        let loader = RowLoader::new(source, Vec::new(), None);
        loader.cache_mut().set_total_rows(total);
        loader
    }

    #[test]
    fn throttle_is_leading_edge() {
        let throttle = Throttle::new(200.0);
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(100.0));
        assert!(!throttle.ready(199.0));
        assert!(throttle.ready(250.0));
    }

    #[test]
    fn plan_groups_contiguous_runs() {
        let wanted: BTreeSet<usize> = [3, 4, 5, 9, 10].into_iter().collect();
        let runs = plan_chunk_runs(&wanted);
        assert_eq!(
            runs,
            vec![
                ChunkRun { first: 3, last: 5, initial: false },
                ChunkRun { first: 9, last: 10, initial: false },
            ]
        );
    }

    #[test]
    fn plan_splits_oversized_runs() {
        // MAX_RECORDS_PER_CALL / CHUNK_SIZE = 4 chunks per call.
        let wanted: BTreeSet<usize> = (2..=11).collect();
        let runs = plan_chunk_runs(&wanted);
        assert_eq!(
            runs,
            vec![
                ChunkRun { first: 2, last: 5, initial: false },
                ChunkRun { first: 6, last: 9, initial: false },
                ChunkRun { first: 10, last: 11, initial: false },
            ]
        );
    }

    #[test]
    fn plan_peels_chunk_zero_into_initial_path() {
        let wanted: BTreeSet<usize> = (0..=6).collect();
        let runs = plan_chunk_runs(&wanted);
        assert_eq!(runs[0], ChunkRun { first: 0, last: 1, initial: true });
        assert_eq!(runs[1], ChunkRun { first: 2, last: 5, initial: false });
        assert_eq!(runs[2], ChunkRun { first: 6, last: 6, initial: false });
    }

    #[test]
    fn visible_slice_requests_exactly_covering_chunks() {
        // CHUNK_SIZE = 50, totalRows = 1000, slice [120, 150) scrolling down.
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        loader.update_visible_rows(Slice::new(60, 90), 0.0);
        let runs = loader.update_visible_rows(Slice::new(120, 150), 1000.0);
        // 150 % 50 = 0 is not within PREFETCH_THRESHOLD of the chunk edge,
        // so chunk 4 is not prefetched.
        assert_eq!(runs, vec![ChunkRun { first: 2, last: 3, initial: false }]);
    }

    #[test]
    fn downward_prefetch_near_chunk_edge() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        loader.update_visible_rows(Slice::new(0, 30), 0.0);
        // end = 145: 145 % 50 = 45 > 50 - 10 → prefetch chunk 3.
        let runs = loader.update_visible_rows(Slice::new(115, 145), 1000.0);
        assert_eq!(runs, vec![ChunkRun { first: 2, last: 3, initial: false }]);
    }

    #[test]
    fn upward_prefetch_near_chunk_edge() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        loader.update_visible_rows(Slice::new(500, 530), 0.0);
        // Scrolling up; start = 205: 205 % 50 = 5 < 10 → prefetch chunk 3.
        let runs = loader.update_visible_rows(Slice::new(205, 235), 1000.0);
        assert_eq!(runs, vec![ChunkRun { first: 3, last: 4, initial: false }]);
    }

    #[test]
    fn eviction_runs_unconditionally_on_every_pass() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        {
            let mut cache = loader.cache_mut();
            for i in 0..600 {
                cache.insert(Row::new(i, RowValues::new()));
            }
        }
        let slice = Slice::new(300, 330);
        loader.update_visible_rows(slice, 0.0);
        let cache = loader.cache();
        for (&i, _) in cache.iter() {
            assert!(i >= slice.start - BUFFER_SIZE && i <= slice.end + BUFFER_SIZE);
        }
    }

    #[test]
    fn dispatch_loads_rows_and_marks_chunks() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
        block_on(loader.dispatch(runs));

        let cache = loader.cache();
        assert_eq!(cache.chunk_states.get(2), ChunkState::Loaded);
        assert_eq!(cache.chunk_states.get(3), ChunkState::Loaded);
        assert!(cache.contains(120));
        assert!(cache.contains(199));
        // One coalesced call: offset 100, limit 100.
        let queries = source.queries.borrow();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].offset, 100);
        assert_eq!(queries[0].limit, 100);
    }

    #[test]
    fn loading_chunks_are_not_rerequested() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        let first = loader.update_visible_rows(Slice::new(120, 150), 0.0);
        assert!(!first.is_empty());
        // Same window again, past the throttle: chunks are Loading → no plan.
        let second = loader.update_visible_rows(Slice::new(120, 150), 1000.0);
        assert!(second.is_empty());
    }

    #[test]
    fn failure_reverts_chunks_for_retry() {
        let source = Rc::new(FakeSource::failing());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
        block_on(loader.dispatch(runs));

        let cache = loader.cache();
        assert_eq!(cache.chunk_states.get(2), ChunkState::Unloaded);
        assert_eq!(cache.chunk_states.get(3), ChunkState::Unloaded);
        assert!(cache.is_empty());
    }

    #[test]
    fn initial_load_bursts_two_chunks() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        block_on(loader.fetch_chunk(0, true)).unwrap();
        let cache = loader.cache();
        assert_eq!(cache.chunk_states.get(0), ChunkState::Loaded);
        assert_eq!(cache.chunk_states.get(1), ChunkState::Loaded);
        let queries = source.queries.borrow();
        assert_eq!(queries[0].limit, INITIAL_LOAD_SIZE);
    }

    #[test]
    fn evicted_loaded_chunk_is_refetched_on_return() {
        let source = Rc::new(FakeSource::new());
        let loader = loader_with_total(Rc::clone(&source), 1000);
        let runs = loader.update_visible_rows(Slice::new(120, 150), 0.0);
        block_on(loader.dispatch(runs));
        // Scroll far away: rows for chunks 2-3 get evicted, states stay Loaded.
        let runs = loader.update_visible_rows(Slice::new(700, 730), 1000.0);
        block_on(loader.dispatch(runs));
        assert!(loader.cache().chunk_missing(2));
        // Scrolling back re-requests the evicted chunks despite Loaded state.
        let runs = loader.update_visible_rows(Slice::new(120, 150), 2000.0);
        assert_eq!(runs, vec![ChunkRun { first: 2, last: 3, initial: false }]);
    }
}
