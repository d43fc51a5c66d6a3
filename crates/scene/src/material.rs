use foundation::Rgb;

use crate::shaders::ShaderSource;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlendMode {
    /// `src * a + dst * (1 - a)`
    Alpha,
    /// `src * a + dst`
    Additive,
}

/// Which triangle faces are drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaceSide {
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub shader: ShaderSource,
    pub color: Rgb,
    pub opacity: f32,
    pub blend: BlendMode,
    pub side: FaceSide,
    pub depth_write: bool,
}

impl Material {
    /// Unlit translucent surface.
    pub fn basic(shader: ShaderSource, color: Rgb, opacity: f32) -> Self {
        Self {
            shader,
            color,
            opacity,
            blend: BlendMode::Alpha,
            side: FaceSide::Front,
            depth_write: true,
        }
    }

    pub fn additive(shader: ShaderSource, color: Rgb) -> Self {
        Self {
            shader,
            color,
            opacity: 1.0,
            blend: BlendMode::Additive,
            side: FaceSide::Front,
            depth_write: false,
        }
    }

    pub fn back_side(mut self) -> Self {
        self.side = FaceSide::Back;
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    /// Position the light shines from; it points at the origin.
    pub position: [f32; 3],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: Rgb::from_hex(0x404040),
                intensity: 0.2,
            },
            directional: DirectionalLight {
                color: Rgb::WHITE,
                intensity: 0.5,
                position: [1.0, 1.0, 1.0],
            },
        }
    }
}
