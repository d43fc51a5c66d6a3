//! WGSL programs for the three globe layers.
//!
//! Every program binds the same per-layer uniform block at group 0, binding 0;
//! the byte layout is mirrored by `gpu::LayerUniforms`.

macro_rules! layer_uniforms {
    () => {
        r#"
struct Layer {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_pos: vec4<f32>,
    color: vec4<f32>,
    // x: time (s), y: glow power, z: point scale, w: unused
    params: vec4<f32>,
    // x: rate, y: spread, z: amplitude, w: unused
    pulse: vec4<f32>,
    // x: width (px), y: height (px)
    viewport: vec4<f32>,
};

@group(0) @binding(0) var<uniform> layer: Layer;
"#
    };
}

pub const OCEAN_WGSL: &str = concat!(
    layer_uniforms!(),
    r#"
struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VsIn) -> @builtin(position) vec4<f32> {
    return layer.view_proj * layer.model * vec4<f32>(in.position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return layer.color;
}
"#
);

pub const GLOW_WGSL: &str = concat!(
    layer_uniforms!(),
    r#"
struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) intensity: f32,
};

@vertex
fn vs_main(in: VsIn) -> VsOut {
    var out: VsOut;
    out.clip = layer.view_proj * layer.model * vec4<f32>(in.position, 1.0);
    let n = normalize((layer.model * vec4<f32>(in.normal, 0.0)).xyz);
    let d = dot(normalize(layer.camera_pos.xyz), n);
    out.intensity = pow(abs(d), layer.params.y);
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(layer.color.rgb * in.intensity, 1.0);
}
"#
);

pub const PARTICLE_WGSL: &str = concat!(
    layer_uniforms!(),
    r#"
struct InstanceIn {
    @location(0) center: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) size: f32,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) corner: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32, inst: InstanceIn) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vi];

    let clip = layer.view_proj * layer.model * vec4<f32>(inst.center, 1.0);
    let pulse = sin(layer.params.x * layer.pulse.x + inst.center.x * layer.pulse.y)
        * layer.pulse.z + 1.0;
    // Point diameter in pixels shrinks with view depth.
    let px = inst.size * pulse * layer.params.z / max(clip.w, 0.001);
    let half_ndc = vec2<f32>(px / layer.viewport.x, px / layer.viewport.y);

    var out: VsOut;
    out.clip = clip + vec4<f32>(corner * half_ndc * clip.w, 0.0, 0.0);
    out.color = inst.color;
    out.corner = corner;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let d = length(in.corner) * 0.5;
    if (d > 0.5) {
        discard;
    }
    let glow = pow(1.0 - d * 2.0, 2.0);
    return vec4<f32>(in.color * glow, glow);
}
"#
);

/// An opaque shader payload handed to the render backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: &'static str,
    pub wgsl: &'static str,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
}

impl ShaderSource {
    pub const fn new(label: &'static str, wgsl: &'static str) -> Self {
        Self {
            label,
            wgsl,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
        }
    }

    pub fn ocean() -> Self {
        Self::new("globe ocean", OCEAN_WGSL)
    }

    pub fn glow() -> Self {
        Self::new("globe glow", GLOW_WGSL)
    }

    pub fn particles() -> Self {
        Self::new("globe particles", PARTICLE_WGSL)
    }
}

#[cfg(test)]
mod tests {
    use super::ShaderSource;

    #[test]
    fn every_program_has_entries_and_uniforms() {
        for s in [
            ShaderSource::ocean(),
            ShaderSource::glow(),
            ShaderSource::particles(),
        ] {
            assert!(s.wgsl.contains("fn vs_main"), "{}", s.label);
            assert!(s.wgsl.contains("fn fs_main"), "{}", s.label);
            assert!(
                s.wgsl.contains("@group(0) @binding(0) var<uniform> layer: Layer;"),
                "{}",
                s.label
            );
        }
    }

    #[test]
    fn particle_program_pulses_and_discards() {
        let s = ShaderSource::particles();
        assert!(s.wgsl.contains("layer.pulse.x"));
        assert!(s.wgsl.contains("discard"));
    }
}
