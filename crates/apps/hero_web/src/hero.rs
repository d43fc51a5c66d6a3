//! The globe hero component: samples the continents, builds the scene,
//! allocates it on a render backend and draws one animation step per frame.

use foundation::math::{Orientation, orientation_facing};
use gpu::{FrameUniforms, RenderBackend, SceneHandles, Viewport};
use runtime::{AnimationDriver, AnimationState, Frame, FrameHandler};
use scene::{GlobeScene, RegionSamples, build_globe, builtin_regions};
use tracing::{debug, info, warn};

use crate::config::HeroConfig;
use crate::error::HeroError;

/// The host canvas the hero draws into.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSurface {
    pub id: String,
    pub viewport: Viewport,
}

/// Orientation that brings `region` to the front, from the mean direction of
/// its samples. Unknown or empty regions give no target.
pub fn focus_orientation(samples: &[RegionSamples], region: Option<&str>) -> Option<Orientation> {
    let id = region?;
    let Some(found) = samples.iter().find(|s| s.region_id == id) else {
        warn!(region = id, "focus region is not a known region");
        return None;
    };
    match found.centroid() {
        Some(centre) => Some(orientation_facing(centre)),
        None => {
            warn!(region = id, "focus region has no sampled points");
            None
        }
    }
}

pub struct HeroGlobe<B: RenderBackend> {
    canvas_id: String,
    backend: B,
    handles: Option<SceneHandles>,
    scene: GlobeScene,
    driver: AnimationDriver,
}

impl<B: RenderBackend> HeroGlobe<B> {
    /// Build and allocate the whole scene. Fails without leaving anything
    /// allocated when the canvas or backend is missing or allocation fails.
    pub fn new(
        canvas: Option<CanvasSurface>,
        backend: Option<B>,
        config: HeroConfig,
    ) -> Result<Self, HeroError> {
        config.validate()?;
        let canvas = canvas.ok_or_else(|| {
            HeroError::MissingDependency(format!("canvas #{}", config.canvas_id))
        })?;
        let mut backend =
            backend.ok_or_else(|| HeroError::MissingDependency("rendering backend".to_string()))?;

        let regions = builtin_regions()?;
        let samples = config.sampler()?.sample_regions(&regions);
        let focus = focus_orientation(&samples, config.focus_region.as_deref());
        let scene = build_globe(&samples, &config.style());

        let profile = config.profile();
        let mut handles = backend
            .create_scene(&scene, canvas.viewport)
            .map_err(|e| HeroError::Initialization(e.to_string()))?;
        handles.camera.distance = profile.start_distance as f64;

        info!(
            canvas = %canvas.id,
            particles = scene.particle_count(),
            width = canvas.viewport.width,
            height = canvas.viewport.height,
            "hero globe initialized"
        );

        Ok(Self {
            canvas_id: canvas.id,
            backend,
            handles: Some(handles),
            scene,
            driver: AnimationDriver::new(profile, focus),
        })
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn scene(&self) -> &GlobeScene {
        &self.scene
    }

    pub fn state(&self) -> AnimationState {
        *self.driver.state()
    }

    pub fn focus_target(&self) -> Option<Orientation> {
        self.driver.focus_target()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.handles.as_ref().map(|h| h.viewport)
    }

    pub fn is_attached(&self) -> bool {
        self.handles.is_some()
    }

    pub fn set_scroll_progress(&mut self, progress: f32) {
        self.driver.set_scroll_progress(progress);
    }

    /// Advance the animation and draw. A detached globe ignores frames.
    pub fn frame(&mut self, frame: Frame) -> Result<AnimationState, HeroError> {
        let Some(handles) = self.handles.as_mut() else {
            debug!(frame = frame.index, "frame after teardown; ignoring");
            return Ok(*self.driver.state());
        };
        let state = self.driver.step(frame);
        handles.camera.distance = state.camera_distance as f64;
        let uniforms = FrameUniforms::compose(&self.scene, &handles.camera, handles.viewport, &state);
        self.backend.render(handles, &uniforms)?;
        Ok(state)
    }

    /// New surface size; the animation carries on where it was.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), HeroError> {
        let Some(handles) = self.handles.as_mut() else {
            return Ok(());
        };
        if handles.viewport == viewport {
            return Ok(());
        }
        handles.set_viewport(viewport);
        self.backend.resize(handles)?;
        debug!(width = viewport.width, height = viewport.height, "hero resized");
        Ok(())
    }

    /// Release every backend resource. Returns `false` if already released.
    pub fn teardown(&mut self) -> bool {
        let Some(handles) = self.handles.take() else {
            return false;
        };
        self.backend.release(handles);
        info!(canvas = %self.canvas_id, "hero globe released");
        true
    }
}

impl<B: RenderBackend> FrameHandler for HeroGlobe<B> {
    type Error = HeroError;

    fn on_frame(&mut self, frame: Frame) -> Result<(), HeroError> {
        self.frame(frame).map(|_| ())
    }
}

impl<B: RenderBackend> Drop for HeroGlobe<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
