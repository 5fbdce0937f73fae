//! # Snow Simulation
//!
//! Fixed-timestep orchestration of a GPU particle/grid simulation: the step
//! scheduler, the double-buffered state, the compute stage and the frame loop
//! that hands settled state to the renderer.

pub mod compute;
pub mod config;
pub mod double_buffer;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod host;
pub mod render;
pub mod scheduler;
pub mod state;
pub mod uniforms;

pub use compute::*;
pub use config::*;
pub use double_buffer::*;
pub use error::*;
pub use frame_loop::*;
pub use gpu::*;
pub use host::*;
pub use render::*;
pub use scheduler::*;
pub use state::*;
pub use uniforms::*;
