//! # Snow Physics
//!
//! GPU record layouts for the particle/grid snow simulation, mesh sampling for
//! seed points and the initial particle seeding policy.

pub mod constants;
pub mod particle;
pub mod sampling;
pub mod seed;

pub use constants::*;
pub use particle::*;
pub use sampling::*;
pub use seed::*;
