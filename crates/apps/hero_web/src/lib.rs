pub mod config;
pub mod error;
pub mod hero;
pub mod lifecycle;

#[cfg(target_arch = "wasm32")]
pub mod web;
#[cfg(target_arch = "wasm32")]
mod wgpu;

pub use config::*;
pub use error::*;
pub use hero::*;
pub use lifecycle::*;

#[cfg(target_arch = "wasm32")]
pub use wgpu::WgpuBackend;
