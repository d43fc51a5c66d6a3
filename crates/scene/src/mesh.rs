use std::f32::consts::{PI, TAU};

/// Indexed UV sphere, triangle list, counter-clockwise from outside.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u16>,
}

impl SphereMesh {
    /// Segment counts are clamped to `[3, 255]` so indices fit in `u16`.
    pub fn uv(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.clamp(3, 255);
        let height_segments = height_segments.clamp(3, 255);

        let vertex_count = ((height_segments + 1) * (width_segments + 1)) as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        for row in 0..=height_segments {
            let phi = row as f32 / height_segments as f32 * PI;
            let (sin_phi, cos_phi) = phi.sin_cos();

            for col in 0..=width_segments {
                let theta = col as f32 / width_segments as f32 * TAU;
                let (sin_theta, cos_theta) = theta.sin_cos();

                let n = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
                positions.push([n[0] * radius, n[1] * radius, n[2] * radius]);
                normals.push(n);
            }
        }

        let stride = width_segments + 1;
        let mut indices = Vec::with_capacity((height_segments * width_segments * 6) as usize);
        for row in 0..height_segments {
            for col in 0..width_segments {
                let i0 = row * stride + col;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;

                indices.extend_from_slice(&[
                    i0 as u16, i1 as u16, i2 as u16, i1 as u16, i3 as u16, i2 as u16,
                ]);
            }
        }

        Self {
            radius,
            width_segments,
            height_segments,
            positions,
            normals,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
