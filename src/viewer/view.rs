//! The wasm-exported `GridView`: DOM event wiring, animation-frame
//! scheduling, and the paint loop around [`GridShell`].

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Object;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent};

use super::events;
use super::source::{JsDataSource, JsPersistence};
use super::{AsyncTask, GridShell};
use crate::cache::GroupByColumn;
use crate::datasource::GroupSort;
use crate::error::log_error;
use crate::interaction::{Effect, Key, KeyInput, PointerInput};
use crate::render::backend::{DataSnapshot, RenderParams};
use crate::render::{CanvasRenderer, RenderBackend};
use crate::types::GridColumn;

pub(crate) fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

/// Pending animation-frame request; a new request cancels and replaces the
/// old one so event bursts produce at most one paint per frame.
#[derive(Default)]
struct RafState {
    handle: Option<i32>,
    closure: Option<Closure<dyn FnMut()>>,
}

/// Group-by spec entry as provided by the host.
#[derive(serde::Deserialize)]
struct GroupBySpec {
    #[serde(rename = "columnId")]
    column_id: String,
    title: String,
    uidt: Option<crate::types::ColumnType>,
    #[serde(default)]
    sort: Option<String>,
}

/// The main viewer struct exported to JavaScript.
#[wasm_bindgen]
pub struct GridView {
    shell: Rc<RefCell<GridShell>>,
    renderer: Rc<RefCell<CanvasRenderer>>,
    raf: Rc<RefCell<RafState>>,
    #[allow(dead_code)]
    mouse_closures: Vec<Closure<dyn FnMut(MouseEvent)>>,
    #[allow(dead_code)]
    wheel_closure: Option<Closure<dyn FnMut(WheelEvent)>>,
    #[allow(dead_code)]
    key_closure: Option<Closure<dyn FnMut(KeyboardEvent)>>,
}

#[wasm_bindgen]
impl GridView {
    /// Create a viewer over a canvas and a host data source. Event
    /// handlers are registered here; no manual wiring is required.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, source: Object, dpr: f32) -> Result<GridView, JsValue> {
        console_error_panic_hook::set_once();

        let shell = Rc::new(RefCell::new(GridShell::new(Rc::new(JsDataSource::new(
            source,
        )))));
        let renderer = Rc::new(RefCell::new(CanvasRenderer::new(canvas.clone(), dpr)?));
        let raf = Rc::new(RefCell::new(RafState::default()));

        let mut view = GridView {
            shell,
            renderer,
            raf,
            mouse_closures: Vec::new(),
            wheel_closure: None,
            key_closure: None,
        };
        view.attach_listeners(&canvas)?;
        Ok(view)
    }

    /// Install the column list (array of `{id, title, width, uidt, fixed,
    /// primary, readonly, order}`).
    pub fn set_columns(&self, value: JsValue) -> Result<(), JsValue> {
        let fields: Vec<GridColumn> = serde_wasm_bindgen::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("columns: {e}")))?;
        {
            let mut shell = self.shell.borrow_mut();
            shell.state.set_columns(fields);
        }
        self.refresh();
        Ok(())
    }

    pub fn set_persistence(&self, target: Object) {
        self.shell.borrow_mut().persistence = Some(Rc::new(JsPersistence::new(target)));
    }

    /// Dataset size, as reported by the host's count endpoint.
    pub fn set_total_rows(&self, total: usize) {
        {
            let shell = self.shell.borrow_mut();
            shell.root_loader().cache_mut().set_total_rows(total);
        }
        self.refresh();
    }

    /// Install (or clear) the group-by spec.
    pub fn set_group_by(&self, value: JsValue) -> Result<(), JsValue> {
        let specs: Vec<GroupBySpec> = serde_wasm_bindgen::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("groupBy: {e}")))?;
        let group_by = specs
            .into_iter()
            .map(|s| GroupByColumn {
                column_id: s.column_id,
                title: s.title,
                column_type: s.uidt,
                sort: match s.sort.as_deref() {
                    Some("desc") => GroupSort::ValueDesc,
                    Some("count-asc") => GroupSort::CountAsc,
                    Some("count-desc") => GroupSort::CountDesc,
                    _ => GroupSort::ValueAsc,
                },
            })
            .collect();
        self.shell.borrow_mut().set_group_by(group_by);
        self.refresh();
        Ok(())
    }

    pub fn resize(&self, width: u32, height: u32, dpr: f32) {
        {
            let mut shell = self.shell.borrow_mut();
            shell.state.viewport.width = f64::from(width);
            shell.state.viewport.height = f64::from(height);
            self.renderer.borrow_mut().resize(width, height, dpr);
        }
        self.refresh();
    }

    /// Absolute scroll position (e.g. from an external scroll container).
    pub fn set_scroll(&self, left: f64, top: f64) {
        {
            let mut shell = self.shell.borrow_mut();
            let content_height = shell.content_height();
            shell.state.viewport.scroll_left = left;
            shell.state.viewport.scroll_top = top;
            shell.state.viewport.clamp_scroll(
                shell.state.layout.total_width(),
                content_height,
                shell.state.config.header_height,
            );
        }
        self.refresh();
    }

    /// Kick off the initial above-the-fold load.
    pub fn load_initial(&self) {
        let shell = Rc::clone(&self.shell);
        let raf = Rc::clone(&self.raf);
        let renderer = Rc::clone(&self.renderer);
        let loader = self.shell.borrow().root_loader();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = loader.fetch_chunk(0, true).await {
                log_error("initial load failed", &err);
            }
            request_redraw(&shell, &renderer, &raf);
        });
    }

    /// Re-run the visibility pass and schedule a paint.
    pub fn refresh(&self) {
        let tasks = self.shell.borrow_mut().update_visible_rows(now_ms());
        self.spawn_tasks(tasks);
        request_redraw(&self.shell, &self.renderer, &self.raf);
    }

    /// Paint synchronously (e.g. first frame after load).
    pub fn render(&self) {
        paint(&self.shell, &self.renderer);
    }

    pub fn undo(&self) {
        let tasks = self.shell.borrow_mut().undo(now_ms());
        self.spawn_tasks(tasks);
        request_redraw(&self.shell, &self.renderer, &self.raf);
    }

    pub fn redo(&self) {
        let tasks = self.shell.borrow_mut().redo(now_ms());
        self.spawn_tasks(tasks);
        request_redraw(&self.shell, &self.renderer, &self.raf);
    }
}

impl GridView {
    fn spawn_tasks(&self, tasks: Vec<AsyncTask>) {
        let shell = &self.shell;
        let renderer = &self.renderer;
        let raf = &self.raf;
        for task in tasks {
            let shell = Rc::clone(shell);
            let renderer = Rc::clone(renderer);
            let raf = Rc::clone(raf);
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = task.run().await {
                    log_error("background task failed", &err);
                }
                // Re-render once the call settles, whatever the outcome.
                request_redraw(&shell, &renderer, &raf);
            });
        }
    }

    fn attach_listeners(&mut self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let pointer = |kind: PointerKind| {
            let shell = Rc::clone(&self.shell);
            let renderer = Rc::clone(&self.renderer);
            let raf = Rc::clone(&self.raf);
            let canvas = canvas.clone();
            Closure::wrap(Box::new(move |event: MouseEvent| {
                let rect = canvas.get_bounding_client_rect();
                let input = PointerInput {
                    x: f64::from(event.client_x()) - rect.left(),
                    y: f64::from(event.client_y()) - rect.top(),
                    shift: event.shift_key(),
                    alt: event.alt_key(),
                    cmd_or_ctrl: event.meta_key() || event.ctrl_key(),
                };
                let tasks = {
                    let mut shell_mut = shell.borrow_mut();
                    match kind {
                        PointerKind::Down => events::pointer_down(&mut shell_mut, input, now_ms()),
                        PointerKind::Move => events::pointer_move(&mut shell_mut, input, now_ms()),
                        PointerKind::Up => events::pointer_up(&mut shell_mut, input, now_ms()),
                    }
                };
                spawn_detached(&shell, &renderer, &raf, tasks);
                request_redraw(&shell, &renderer, &raf);
            }) as Box<dyn FnMut(MouseEvent)>)
        };

        let down = pointer(PointerKind::Down);
        canvas.add_event_listener_with_callback("mousedown", down.as_ref().unchecked_ref())?;
        // Move/up attach to the document: gestures keep tracking outside
        // the canvas and always release.
        let moved = pointer(PointerKind::Move);
        document.add_event_listener_with_callback("mousemove", moved.as_ref().unchecked_ref())?;
        let up = pointer(PointerKind::Up);
        document.add_event_listener_with_callback("mouseup", up.as_ref().unchecked_ref())?;
        self.mouse_closures = vec![down, moved, up];

        let wheel = {
            let shell = Rc::clone(&self.shell);
            let renderer = Rc::clone(&self.renderer);
            let raf = Rc::clone(&self.raf);
            Closure::wrap(Box::new(move |event: WheelEvent| {
                event.prevent_default();
                let tasks = {
                    let mut shell_mut = shell.borrow_mut();
                    shell_mut.apply_effects(
                        vec![Effect::ScrollBy {
                            dx: event.delta_x(),
                            dy: event.delta_y(),
                        }],
                        now_ms(),
                    )
                };
                spawn_detached(&shell, &renderer, &raf, tasks);
                request_redraw(&shell, &renderer, &raf);
            }) as Box<dyn FnMut(WheelEvent)>)
        };
        canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
        self.wheel_closure = Some(wheel);

        let key = {
            let shell = Rc::clone(&self.shell);
            let renderer = Rc::clone(&self.renderer);
            let raf = Rc::clone(&self.raf);
            Closure::wrap(Box::new(move |event: KeyboardEvent| {
                let cmd_or_ctrl = event.meta_key() || event.ctrl_key();
                let name = event.key();
                if cmd_or_ctrl && (name == "z" || name == "Z") {
                    let tasks = {
                        let mut shell_mut = shell.borrow_mut();
                        if event.shift_key() {
                            shell_mut.redo(now_ms())
                        } else {
                            shell_mut.undo(now_ms())
                        }
                    };
                    spawn_detached(&shell, &renderer, &raf, tasks);
                    request_redraw(&shell, &renderer, &raf);
                    event.prevent_default();
                    return;
                }
                let Some(key) = Key::from_name(&name) else {
                    return;
                };
                let input = KeyInput {
                    key,
                    shift: event.shift_key(),
                    cmd_or_ctrl,
                    alt: event.alt_key(),
                };
                let tasks = {
                    let mut shell_mut = shell.borrow_mut();
                    events::key_down(&mut shell_mut, input, now_ms())
                };
                if !tasks.is_empty() || shell.borrow().needs_render {
                    event.prevent_default();
                }
                spawn_detached(&shell, &renderer, &raf, tasks);
                request_redraw(&shell, &renderer, &raf);
            }) as Box<dyn FnMut(KeyboardEvent)>)
        };
        document.add_event_listener_with_callback("keydown", key.as_ref().unchecked_ref())?;
        self.key_closure = Some(key);

        Ok(())
    }
}

#[derive(Clone, Copy)]
enum PointerKind {
    Down,
    Move,
    Up,
}

impl Drop for GridView {
    /// Release the document-level listeners on component disposal so a
    /// torn-down grid cannot keep reacting to input.
    fn drop(&mut self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(closure) = self.mouse_closures.get(1) {
            let _ = document.remove_event_listener_with_callback(
                "mousemove",
                closure.as_ref().unchecked_ref(),
            );
        }
        if let Some(closure) = self.mouse_closures.get(2) {
            let _ = document.remove_event_listener_with_callback(
                "mouseup",
                closure.as_ref().unchecked_ref(),
            );
        }
        if let Some(closure) = &self.key_closure {
            let _ = document.remove_event_listener_with_callback(
                "keydown",
                closure.as_ref().unchecked_ref(),
            );
        }
    }
}

fn spawn_detached(
    shell: &Rc<RefCell<GridShell>>,
    renderer: &Rc<RefCell<CanvasRenderer>>,
    raf: &Rc<RefCell<RafState>>,
    tasks: Vec<AsyncTask>,
) {
    for task in tasks {
        let shell = Rc::clone(shell);
        let renderer = Rc::clone(renderer);
        let raf = Rc::clone(raf);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = task.run().await {
                log_error("background task failed", &err);
            }
            request_redraw(&shell, &renderer, &raf);
        });
    }
}

/// Schedule a coalesced paint: any pending frame request is canceled and
/// replaced, never queued.
fn request_redraw(
    shell: &Rc<RefCell<GridShell>>,
    renderer: &Rc<RefCell<CanvasRenderer>>,
    raf: &Rc<RefCell<RafState>>,
) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let mut raf_state = raf.borrow_mut();
    if let Some(handle) = raf_state.handle.take() {
        let _ = window.cancel_animation_frame(handle);
    }
    if raf_state.closure.is_none() {
        let shell = Rc::clone(shell);
        let renderer = Rc::clone(renderer);
        let raf_inner = Rc::clone(raf);
        raf_state.closure = Some(Closure::wrap(Box::new(move || {
            raf_inner.borrow_mut().handle = None;
            paint(&shell, &renderer);
        }) as Box<dyn FnMut()>));
    }
    if let Some(closure) = &raf_state.closure {
        match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(handle) => raf_state.handle = Some(handle),
            Err(_) => raf_state.handle = None,
        }
    }
}

/// Paint one frame from whatever is currently cached.
fn paint(shell: &Rc<RefCell<GridShell>>, renderer: &Rc<RefCell<CanvasRenderer>>) {
    let mut shell = shell.borrow_mut();
    shell.needs_render = false;

    // The hit index is rebuilt by the renderer; take it out so the shell
    // can be borrowed immutably for the frame.
    let mut hit_index = std::mem::take(&mut shell.state.hit_index);

    {
        let caches: Vec<(Vec<usize>, std::cell::Ref<'_, crate::cache::RowCache>)> = shell
            .loaders()
            .map(|(path, loader)| (path.clone(), loader.cache()))
            .collect();
        let mut data = DataSnapshot::new();
        for (path, cache) in &caches {
            data.push(path.clone(), cache);
        }
        let groups = shell.group_loader.as_ref().map(|gl| gl.cache());
        let total_rows = caches
            .iter()
            .find(|(path, _)| path.is_empty())
            .map_or(0, |(_, cache)| cache.total_rows());

        let params = RenderParams {
            state: &shell.state,
            data: &data,
            groups: groups.as_deref(),
            total_rows,
        };
        if let Err(err) = renderer.borrow_mut().render(&params, &mut hit_index) {
            log_error("render failed", &err);
        }
    }

    shell.state.hit_index = hit_index;
}
