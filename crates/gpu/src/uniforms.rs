use runtime::AnimationState;
use scene::{GlobeScene, Material};

use crate::camera::{Mat4, PerspectiveCamera, model_matrix};
use crate::renderer::Viewport;

/// Per-layer uniform block; layout matches `struct Layer` in the WGSL programs.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LayerUniforms {
    pub view_proj: Mat4,
    pub model: Mat4,
    pub camera_pos: [f32; 4],
    pub color: [f32; 4],
    /// time (s), glow power, point scale, unused
    pub params: [f32; 4],
    /// rate, spread, amplitude, unused
    pub pulse: [f32; 4],
    /// width, height (px)
    pub viewport: [f32; 4],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameUniforms {
    pub ocean: LayerUniforms,
    pub glow: LayerUniforms,
    pub particles: LayerUniforms,
    pub clear_color: [f32; 4],
}

impl FrameUniforms {
    pub fn compose(
        scene: &GlobeScene,
        camera: &PerspectiveCamera,
        viewport: Viewport,
        state: &AnimationState,
    ) -> Self {
        let shared = LayerUniforms {
            view_proj: camera.view_proj(),
            model: model_matrix(state.model_orientation(), state.scale),
            camera_pos: [0.0, 0.0, camera.distance as f32, 1.0],
            color: [0.0; 4],
            params: [state.time_s, 0.0, 0.0, 0.0],
            pulse: [0.0; 4],
            viewport: [viewport.width as f32, viewport.height as f32, 0.0, 0.0],
        };
        let with_material = |m: &Material| LayerUniforms {
            color: m.color.with_alpha(m.opacity),
            ..shared
        };

        let mut glow = with_material(&scene.glow.material);
        glow.params[1] = scene.glow_power;

        let p = &scene.particles;
        let mut particles = with_material(&p.material);
        particles.params[2] = p.point_scale;
        particles.pulse = [p.pulse.rate, p.pulse.spread, p.pulse.amplitude, 0.0];

        Self {
            ocean: with_material(&scene.ocean.material),
            glow,
            particles,
            clear_color: scene.background.with_alpha(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::AnimationProfile;
    use scene::{GlobeStyle, build_globe};

    #[test]
    fn layer_block_is_wgsl_sized() {
        assert_eq!(std::mem::size_of::<LayerUniforms>(), 208);
        assert_eq!(std::mem::size_of::<LayerUniforms>() % 16, 0);
    }

    #[test]
    fn composes_layer_parameters() {
        let scene = build_globe(&[], &GlobeStyle::default());
        let mut camera = PerspectiveCamera::default();
        camera.distance = 4.0;
        let mut state = AnimationState::initial(&AnimationProfile::default());
        state.time_s = 1.25;

        let u = FrameUniforms::compose(&scene, &camera, Viewport::new(800, 600), &state);
        assert_eq!(u.ocean.color[3], 0.3);
        assert_eq!(u.glow.params[1], 2.0);
        assert_eq!(u.particles.params, [1.25, 0.0, 300.0, 0.0]);
        assert_eq!(u.particles.pulse, [2.0, 10.0, 0.1, 0.0]);
        assert_eq!(u.ocean.camera_pos, [0.0, 0.0, 4.0, 1.0]);
        assert_eq!(u.glow.viewport, [800.0, 600.0, 0.0, 0.0]);
        assert_eq!(u.ocean.model, u.particles.model);
        assert_eq!(u.clear_color, [0.0, 0.0, 0.0, 0.0]);
    }
}
