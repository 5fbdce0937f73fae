//! # Snow Renderer
//!
//! Orbit camera, point renderer and window surface target for the snow
//! simulation.

pub mod camera;
pub mod renderer;
pub mod target;

pub use camera::*;
pub use renderer::*;
pub use target::*;
