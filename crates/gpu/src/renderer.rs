use std::sync::{Arc, Mutex};

use foundation::ResourceHandle;
use scene::GlobeScene;

use crate::camera::PerspectiveCamera;
use crate::uniforms::FrameUniforms;

/// Drawing surface size in physical pixels; both sides are at least 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// From CSS/host dimensions, which may be fractional, negative or NaN.
    pub fn from_host(width: f64, height: f64) -> Self {
        let px = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
        Self::new(px(width), px(height))
    }

    /// Scale down, keeping the aspect ratio, until neither side exceeds
    /// `max_side`.
    pub fn fit_within(self, max_side: u32) -> Self {
        let max_side = max_side.max(1);
        let longest = self.width.max(self.height);
        if longest <= max_side {
            return self;
        }
        let scale = max_side as f64 / longest as f64;
        let side = |v: u32| ((v as f64 * scale).round() as u32).min(max_side);
        Self::new(side(self.width), side(self.height))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    ShaderCompile { label: String, message: String },
    ResourceCreation(String),
    SurfaceLost(String),
    Backend(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::ShaderCompile { label, message } => {
                write!(f, "shader {label:?} failed to compile: {message}")
            }
            RenderError::ResourceCreation(msg) => write!(f, "resource creation failed: {msg}"),
            RenderError::SurfaceLost(msg) => write!(f, "render surface lost: {msg}"),
            RenderError::Backend(msg) => write!(f, "render backend error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// First error a device reported outside any error scope.
///
/// Clones share the slot, so a device callback can record into it while the
/// backend checks it before drawing. Later errors do not replace the first.
#[derive(Debug, Clone, Default)]
pub struct DeviceFault(Arc<Mutex<Option<String>>>);

impl DeviceFault {
    pub fn record(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert_with(|| message.into());
        }
    }

    pub fn check(&self) -> Result<(), RenderError> {
        match self.0.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(message) => Err(RenderError::Backend(format!("device error: {message}"))),
                None => Ok(()),
            },
            Err(_) => Err(RenderError::Backend("device error state poisoned".to_string())),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshHandles {
    pub geometry: ResourceHandle,
    pub material: ResourceHandle,
    pub texture: Option<ResourceHandle>,
}

impl MeshHandles {
    fn push_into(&self, out: &mut Vec<ResourceHandle>) {
        out.push(self.geometry);
        out.push(self.material);
        out.extend(self.texture);
    }
}

/// Everything one hero instance holds on the backend.
///
/// Not `Clone`: handing the value to [`RenderBackend::release`] is the only way
/// to give it up.
#[derive(Debug, PartialEq)]
pub struct SceneHandles {
    pub renderer: ResourceHandle,
    pub camera: PerspectiveCamera,
    pub viewport: Viewport,
    pub ocean: MeshHandles,
    pub glow: MeshHandles,
    pub particles: MeshHandles,
}

impl SceneHandles {
    /// Mesh resources first, renderer last.
    pub fn resources(&self) -> Vec<ResourceHandle> {
        let mut out = Vec::with_capacity(7);
        self.ocean.push_into(&mut out);
        self.glow.push_into(&mut out);
        self.particles.push_into(&mut out);
        out.push(self.renderer);
        out
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_viewport(viewport.width, viewport.height);
    }
}

/// The rendering capability the hero draws through.
pub trait RenderBackend {
    /// Allocate everything `scene` needs. All-or-nothing: on error nothing
    /// stays allocated.
    fn create_scene(
        &mut self,
        scene: &GlobeScene,
        viewport: Viewport,
    ) -> Result<SceneHandles, RenderError>;

    fn render(&mut self, handles: &SceneHandles, uniforms: &FrameUniforms)
    -> Result<(), RenderError>;

    /// Resize the drawing surface. `handles.viewport` is already updated.
    fn resize(&mut self, handles: &SceneHandles) -> Result<(), RenderError>;

    fn release(&mut self, handles: SceneHandles);
}
