pub mod material;
pub mod mesh;
pub mod particles;
pub mod prefabs;
pub mod region;
pub mod sampler;
pub mod shaders;

pub use material::*;
pub use mesh::*;
pub use particles::*;
pub use prefabs::*;
pub use region::*;
pub use sampler::*;
pub use shaders::*;
