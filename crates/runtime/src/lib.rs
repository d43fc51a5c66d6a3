pub mod animation;
pub mod easing;
pub mod frame;
pub mod frame_loop;
pub mod subscription;

pub use animation::*;
pub use easing::*;
pub use frame::*;
pub use frame_loop::*;
pub use subscription::*;
