//! Canvas 2D renderer.
//!
//! Repaints the whole surface every frame: row band (flat or grouped),
//! then the frozen header band, then the interaction overlays. Fixed
//! columns are drawn a second time at absolute x so they stay pinned over
//! the already-drawn scrollable region.

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{groups, header, overlay, rows};
use crate::error::{GridError, Result};
use crate::hittest::HitTestIndex;
use crate::render::backend::{RenderBackend, RenderParams};
use crate::render::cells::CellRegistry;

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    pub(crate) ctx: CanvasRenderingContext2d,
    width: u32,
    height: u32,
    dpr: f32,
    pub cells: CellRegistry,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement, dpr: f32) -> Result<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|_| GridError::Render("2d context unavailable".to_string()))?
            .ok_or_else(|| GridError::Render("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| GridError::Render("2d context has unexpected type".to_string()))?;
        Ok(Self {
            canvas,
            ctx,
            width: 800,
            height: 600,
            dpr,
            cells: CellRegistry::new(),
        })
    }

    fn logical_width(&self) -> f64 {
        f64::from(self.width)
    }

    fn logical_height(&self) -> f64 {
        f64::from(self.height)
    }
}

impl RenderBackend for CanvasRenderer {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32, dpr: f32) {
        self.width = width;
        self.height = height;
        self.dpr = dpr;
    }

    fn render(&mut self, params: &RenderParams<'_>, hit_index: &mut HitTestIndex) -> Result<()> {
        let dpr = f64::from(self.dpr);
        let width = self.logical_width();
        let height = self.logical_height();

        // Device-pixel-scaled backing store, logical-pixel coordinates.
        self.canvas.set_width(scaled(self.width, self.dpr));
        self.canvas.set_height(scaled(self.height, self.dpr));
        let _ = self
            .canvas
            .style()
            .set_property("width", &format!("{width}px"));
        let _ = self.ctx.scale(dpr, dpr);
        self.ctx.clear_rect(0.0, 0.0, width, height);

        hit_index.clear();

        if params.groups.is_some() {
            groups::render_groups(&self.ctx, &self.cells, params, hit_index, width, height);
        } else {
            rows::render_rows(&self.ctx, &self.cells, params, hit_index, width, height);
        }
        header::render_header(&self.ctx, params, width);
        overlay::render_overlays(&self.ctx, params, width, height);
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(logical: u32, dpr: f32) -> u32 {
    (f64::from(logical) * f64::from(dpr)).round() as u32
}
