//! Render backend trait and the per-frame parameter bundle.

use crate::cache::{GroupTreeCache, RowCache};
use crate::error::Result;
use crate::hittest::HitTestIndex;
use crate::state::GridState;

/// Borrowed row caches for the frame: the root dataset plus whatever leaf
/// group datasets are on screen, keyed by group path.
pub struct DataSnapshot<'a> {
    entries: Vec<(Vec<usize>, &'a RowCache)>,
}

impl<'a> DataSnapshot<'a> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, path: Vec<usize>, cache: &'a RowCache) {
        self.entries.push((path, cache));
    }

    pub fn rows_for(&self, path: &[usize]) -> Option<&'a RowCache> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_slice() == path)
            .map(|(_, c)| *c)
    }

    /// The root table's cache (empty path).
    pub fn root(&self) -> Option<&'a RowCache> {
        self.rows_for(&[])
    }
}

impl Default for DataSnapshot<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a backend needs to paint one frame. The renderer is a pure
/// function of this bundle; it repaints from scratch every time.
pub struct RenderParams<'a> {
    pub state: &'a GridState,
    pub data: &'a DataSnapshot<'a>,
    /// Present when the view is grouped.
    pub groups: Option<&'a GroupTreeCache>,
    /// Root dataset row count (flat views).
    pub total_rows: usize,
}

/// Pluggable rendering implementations (Canvas 2D today).
pub trait RenderBackend {
    fn init(&mut self) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32, dpr: f32);

    /// Repaint the full surface and rebuild the hit-test index.
    fn render(&mut self, params: &RenderParams<'_>, hit_index: &mut HitTestIndex) -> Result<()>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}
