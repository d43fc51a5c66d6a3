use std::collections::BTreeMap;

use foundation::Rgb;
use foundation::math::Vec3;
use runtime::PulseParams;
use tracing::info;

use crate::material::{Lights, Material};
use crate::mesh::SphereMesh;
use crate::particles::ParticleBuffer;
use crate::sampler::RegionSamples;
use crate::shaders::ShaderSource;

pub const OCEAN_SEGMENTS: (u32, u32) = (64, 32);
pub const OCEAN_OPACITY: f32 = 0.3;
pub const GLOW_SEGMENTS: (u32, u32) = (32, 16);
pub const GLOW_SCALE: f32 = 1.05;
pub const GLOW_POWER: f32 = 2.0;
/// Pixels per world unit of particle size at unit view depth.
pub const POINT_SCALE: f32 = 300.0;

/// Look of the globe; everything the scene needs besides the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeStyle {
    pub radius: f32,
    pub particle_size: f32,
    /// Height of the particle shell above the ocean sphere.
    pub particle_offset: f32,
    pub background: Rgb,
    pub ocean: Rgb,
    pub glow: Rgb,
    /// Per-region particle colors; regions not listed keep their own color.
    pub tints: BTreeMap<String, Rgb>,
    pub pulse: PulseParams,
}

impl Default for GlobeStyle {
    fn default() -> Self {
        Self {
            radius: 1.5,
            particle_size: 0.025,
            particle_offset: 0.01,
            background: Rgb::from_hex(0x000000),
            ocean: Rgb::from_hex(0x0F172A),
            glow: Rgb::from_hex(0x3B82F6),
            tints: BTreeMap::new(),
            pulse: PulseParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshLayer {
    pub mesh: SphereMesh,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleLayer {
    pub buffer: ParticleBuffer,
    pub material: Material,
    pub pulse: PulseParams,
    pub point_scale: f32,
}

/// Renderer-agnostic description of the hero globe.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeScene {
    pub background: Rgb,
    pub ocean: MeshLayer,
    pub glow: MeshLayer,
    pub glow_power: f32,
    pub particles: ParticleLayer,
    pub lights: Lights,
}

impl GlobeScene {
    pub fn particle_count(&self) -> usize {
        self.particles.buffer.len()
    }
}

/// Assemble ocean sphere, rim glow shell and particle cloud.
pub fn build_globe(samples: &[RegionSamples], style: &GlobeStyle) -> GlobeScene {
    let ocean = MeshLayer {
        mesh: SphereMesh::uv(style.radius, OCEAN_SEGMENTS.0, OCEAN_SEGMENTS.1),
        material: Material::basic(ShaderSource::ocean(), style.ocean, OCEAN_OPACITY),
    };
    let glow = MeshLayer {
        mesh: SphereMesh::uv(style.radius * GLOW_SCALE, GLOW_SEGMENTS.0, GLOW_SEGMENTS.1),
        material: Material::additive(ShaderSource::glow(), style.glow).back_side(),
    };
    let buffer = ParticleBuffer::build(
        samples,
        (style.radius + style.particle_offset) as f64,
        style.particle_size,
        &style.tints,
    );
    info!(particles = buffer.len(), regions = samples.len(), "built globe scene");

    GlobeScene {
        background: style.background,
        ocean,
        glow,
        glow_power: GLOW_POWER,
        particles: ParticleLayer {
            buffer,
            material: Material::additive(ShaderSource::particles(), Rgb::WHITE),
            pulse: style.pulse,
            point_scale: POINT_SCALE,
        },
        lights: Lights::default(),
    }
}

/// Rim glow intensity: `|dot(normalize(view), normal)| ^ power`.
///
/// Matches the glow shader; back faces see negative dot products.
pub fn glow_intensity(view: Vec3, normal: Vec3, power: f64) -> f64 {
    view.normalize().dot(normal).abs().powf(power)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{BlendMode, FaceSide};
    use crate::region::builtin_regions;
    use crate::sampler::GeographySampler;

    fn scene() -> GlobeScene {
        let regions = builtin_regions().unwrap();
        let samples = GeographySampler::default().sample_regions(&regions);
        build_globe(&samples, &GlobeStyle::default())
    }

    #[test]
    fn layers_follow_the_style() {
        let s = scene();
        assert_eq!(s.background, Rgb::BLACK);
        assert_eq!(s.ocean.mesh.radius, 1.5);
        assert_eq!(s.ocean.mesh.width_segments, 64);
        assert_eq!(s.ocean.material.opacity, 0.3);
        assert_eq!(s.ocean.material.blend, BlendMode::Alpha);

        assert!((s.glow.mesh.radius - 1.575).abs() < 1e-6);
        assert_eq!(s.glow.mesh.height_segments, 16);
        assert_eq!(s.glow.material.side, FaceSide::Back);
        assert_eq!(s.glow.material.blend, BlendMode::Additive);
        assert!(!s.glow.material.depth_write);
        assert_eq!(s.glow_power, 2.0);

        assert_eq!(s.lights.ambient.intensity, 0.2);
        assert_eq!(s.lights.directional.position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn particles_float_just_above_the_ocean() {
        let s = scene();
        let buf = &s.particles.buffer;
        assert!(s.particle_count() > 500);
        for i in 0..buf.len() {
            let [x, y, z] = buf.position(i);
            assert!(((x * x + y * y + z * z).sqrt() - 1.51).abs() < 1e-5);
        }
        assert_eq!(s.particles.material.blend, BlendMode::Additive);
        assert_eq!(s.particles.point_scale, 300.0);
    }

    #[test]
    fn glow_is_brightest_facing_the_view() {
        let view = Vec3::new(0.0, 0.0, 15.0);
        let facing = glow_intensity(view, Vec3::new(0.0, 0.0, 1.0), 2.0);
        let away = glow_intensity(view, Vec3::new(0.0, 0.0, -1.0), 2.0);
        let rim = glow_intensity(view, Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert!((facing - 1.0).abs() < 1e-12);
        assert!((away - 1.0).abs() < 1e-12);
        assert!(rim.abs() < 1e-12);
        let mid = glow_intensity(view, Vec3::new(0.0, 0.6, 0.8), 2.0);
        assert!((mid - 0.64).abs() < 1e-12);
    }
}
