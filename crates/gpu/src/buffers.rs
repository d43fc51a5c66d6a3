use scene::{ParticleBuffer, SphereMesh};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// One billboard quad; six vertices are generated per instance in the shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub center: [f32; 3],
    pub color: [f32; 3],
    pub size: f32,
}

pub const QUAD_VERTICES: u32 = 6;

pub fn mesh_vertices(mesh: &SphereMesh) -> Vec<MeshVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .map(|(&position, &normal)| MeshVertex { position, normal })
        .collect()
}

pub fn particle_instances(buffer: &ParticleBuffer) -> Vec<ParticleInstance> {
    (0..buffer.len())
        .map(|i| ParticleInstance {
            center: buffer.position(i),
            color: buffer.color(i),
            size: buffer.sizes[i],
        })
        .collect()
}
