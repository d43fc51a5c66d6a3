pub mod buffers;
pub mod camera;
pub mod recording;
pub mod renderer;
pub mod uniforms;

pub use buffers::*;
pub use camera::*;
pub use recording::*;
pub use renderer::*;
pub use uniforms::*;
