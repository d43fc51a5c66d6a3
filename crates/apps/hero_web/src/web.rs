//! Browser bindings: frame scheduling, window listeners and the JS exports.

use std::cell::RefCell;

use gpu::{RenderError, Viewport};
use preferences::{AudienceSegment, LocalStoragePreferenceStore, PreferenceError};
use runtime::{CallbackSubscription, FrameCallback, FrameRequest, FrameScheduler, SchedulerError};
use scene::ShaderSource;
use tracing::{error, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, Window};

use crate::config::HeroConfig;
use crate::error::HeroError;
use crate::hero::{CanvasSurface, HeroGlobe};
use crate::lifecycle::{HeroRuntime, resize_globe};
use crate::wgpu::WgpuBackend;

const MAX_PIXEL_RATIO: f64 = 2.0;
// WebGL2 guaranteed texture size; used until a device reports its own.
const FALLBACK_MAX_SIDE: u32 = 2048;

/// `requestAnimationFrame` driven scheduler.
///
/// Holds the closure of the outstanding request; a frame loop never has more
/// than one.
pub struct RafScheduler {
    window: Window,
    pending: RefCell<Option<(FrameRequest, Closure<dyn FnMut(f64)>)>>,
}

impl RafScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            pending: RefCell::new(None),
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequest, SchedulerError> {
        let closure: Closure<dyn FnMut(f64)> =
            Closure::once(move |timestamp_ms: f64| callback(timestamp_ms));
        let id = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|e| SchedulerError::Unavailable(format!("{e:?}")))?;
        let request = FrameRequest(id);
        // The replaced closure is the one currently running, if any; wasm-bindgen
        // defers freeing it until it returns.
        let previous = self.pending.replace(Some((request, closure)));
        drop(previous);
        Ok(request)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        if let Err(e) = self.window.cancel_animation_frame(request.0) {
            warn!(?e, "cancelAnimationFrame failed");
        }
        let mut pending = self.pending.borrow_mut();
        if matches!(&*pending, Some((r, _)) if *r == request) {
            pending.take();
        }
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn find_canvas(window: &Window, id: &str) -> Option<HtmlCanvasElement> {
    window
        .document()?
        .get_element_by_id(id)?
        .dyn_into::<HtmlCanvasElement>()
        .ok()
}

/// Match the canvas backing store to its CSS box, capped at `max_side`
/// physical pixels per side.
fn fit_canvas(window: &Window, canvas: &HtmlCanvasElement, max_side: u32) -> Viewport {
    let ratio = window.device_pixel_ratio().clamp(1.0, MAX_PIXEL_RATIO);
    let viewport = Viewport::from_host(
        canvas.client_width() as f64 * ratio,
        canvas.client_height() as f64 * ratio,
    )
    .fit_within(max_side);
    canvas.set_width(viewport.width);
    canvas.set_height(viewport.height);
    viewport
}

fn page_scroll_progress(window: &Window) -> f32 {
    let scrolled = window.scroll_y().unwrap_or(0.0);
    let visible = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let total = window
        .document()
        .and_then(|d| d.document_element())
        .map_or(0.0, |e| e.scroll_height() as f64);
    let range = total - visible;
    if range <= 0.0 {
        0.0
    } else {
        (scrolled / range) as f32
    }
}

fn listen(
    window: &Window,
    event: &'static str,
    handler: impl FnMut() + 'static,
) -> Result<CallbackSubscription, HeroError> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|e| HeroError::Initialization(format!("cannot listen to {event}: {e:?}")))?;
    let target = window.clone();
    Ok(CallbackSubscription::new(move || {
        if let Err(e) =
            target.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            warn!(event, ?e, "removeEventListener failed");
        }
    }))
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).map_err(to_js)?;
    Ok(())
}

/// A mounted hero globe.
#[wasm_bindgen]
pub struct HeroHandle {
    runtime: HeroRuntime<WgpuBackend, RafScheduler>,
    window: Window,
    canvas: HtmlCanvasElement,
    max_side: u32,
}

#[wasm_bindgen]
impl HeroHandle {
    /// Re-read the canvas size, e.g. after a layout change that fired no
    /// window resize.
    pub fn resize(&self) -> Result<(), JsValue> {
        let viewport = fit_canvas(&self.window, &self.canvas, self.max_side);
        self.runtime.resize(viewport).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setScrollProgress)]
    pub fn set_scroll_progress(&self, progress: f32) {
        self.runtime.set_scroll_progress(progress);
    }

    pub fn teardown(&mut self) -> bool {
        self.runtime.teardown()
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.runtime.is_running()
    }

    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.runtime.state()).map_err(to_js)
    }
}

/// Mount the hero on `canvasId` (or the configured id) with optional JSON
/// overrides. Rejects when the hero cannot run; the page is left untouched.
#[wasm_bindgen(js_name = mountHero)]
pub async fn mount_hero(
    canvas_id: Option<String>,
    options_json: Option<String>,
) -> Result<HeroHandle, JsValue> {
    mount(canvas_id, options_json).await.map_err(|err| {
        error!(%err, "hero mount failed");
        to_js(err)
    })
}

async fn mount(
    canvas_id: Option<String>,
    options_json: Option<String>,
) -> Result<HeroHandle, HeroError> {
    let mut config = HeroConfig::from_json(options_json.as_deref().unwrap_or(""))?;
    if let Some(id) = canvas_id.filter(|id| !id.trim().is_empty()) {
        config.canvas_id = id;
    }
    config.validate()?;
    let scroll_coupled = config.animation.scroll.is_some();

    let window =
        web_sys::window().ok_or_else(|| HeroError::MissingDependency("window".to_string()))?;
    let canvas = find_canvas(&window, &config.canvas_id);

    let backend = match &canvas {
        Some(c) => {
            let programs = [
                ShaderSource::ocean(),
                ShaderSource::glow(),
                ShaderSource::particles(),
            ];
            match WgpuBackend::from_canvas(c.clone(), &programs).await {
                Ok(backend) => Some(backend),
                Err(err @ RenderError::ShaderCompile { .. }) => {
                    return Err(HeroError::Initialization(err.to_string()));
                }
                Err(err) => {
                    warn!(%err, "no usable graphics adapter");
                    None
                }
            }
        }
        None => None,
    };
    let max_side = backend
        .as_ref()
        .and_then(WgpuBackend::max_surface_side)
        .unwrap_or(FALLBACK_MAX_SIDE);
    let surface = canvas.as_ref().map(|c| CanvasSurface {
        id: config.canvas_id.clone(),
        viewport: fit_canvas(&window, c, max_side),
    });

    let globe = HeroGlobe::new(surface, backend, config)?;
    let mut runtime = HeroRuntime::start(globe, RafScheduler::new(window.clone()))?;
    let canvas = canvas.ok_or_else(|| HeroError::MissingDependency("canvas".to_string()))?;

    let on_resize = {
        let globe = runtime.globe();
        let window = window.clone();
        let canvas = canvas.clone();
        move || {
            let Some(globe) = globe.upgrade() else {
                return;
            };
            let viewport = fit_canvas(&window, &canvas, max_side);
            if let Err(err) = resize_globe(&globe, viewport) {
                error!(%err, "hero resize failed");
            }
        }
    };
    runtime.add_subscription(listen(&window, "resize", on_resize)?);

    if scroll_coupled {
        let on_scroll = {
            let globe = runtime.globe();
            let window = window.clone();
            move || {
                let Some(globe) = globe.upgrade() else {
                    return;
                };
                if let Ok(mut globe) = globe.try_borrow_mut() {
                    globe.set_scroll_progress(page_scroll_progress(&window));
                }
            }
        };
        runtime.add_subscription(listen(&window, "scroll", on_scroll)?);
        // The page may load already scrolled; no event fires for that.
        runtime.set_scroll_progress(page_scroll_progress(&window));
    }

    info!(
        listeners = runtime.subscription_count(),
        scroll_coupled, "hero mounted"
    );
    Ok(HeroHandle {
        runtime,
        window,
        canvas,
        max_side,
    })
}

fn local_store() -> Result<LocalStoragePreferenceStore, PreferenceError> {
    LocalStoragePreferenceStore::new()
}

/// The visitor's saved audience segment, if any.
#[wasm_bindgen(js_name = storedAudience)]
pub fn stored_audience() -> Option<String> {
    let store = local_store().ok()?;
    match preferences::stored_audience(&store) {
        Ok(segment) => segment.map(|s| s.to_string()),
        Err(err) => {
            warn!(%err, "audience preference unreadable");
            None
        }
    }
}

#[wasm_bindgen(js_name = storeAudience)]
pub fn store_audience(segment: &str) -> Result<(), JsValue> {
    let segment: AudienceSegment = segment.parse().map_err(to_js)?;
    let mut store = local_store().map_err(to_js)?;
    preferences::store_audience(&mut store, segment).map_err(to_js)
}

#[wasm_bindgen(js_name = shouldShowAudienceSelection)]
pub fn should_show_audience_selection() -> bool {
    match local_store() {
        Ok(store) => preferences::should_show_audience_selection(&store),
        Err(err) => {
            warn!(%err, "audience preference storage unavailable");
            true
        }
    }
}
