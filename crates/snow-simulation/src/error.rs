//! Error taxonomy for the simulation core
//!
//! Configuration errors fail construction. Device errors are fatal to a running
//! frame loop. Timing anomalies are not errors at all (see `scheduler::TimingAnomaly`).

use thiserror::Error;

/// Invalid construction parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("particle count must be positive")]
    NonPositiveParticleCount,
    #[error("grid resolution must be positive")]
    NonPositiveGridResolution,
    #[error("simulation timestep must be positive and finite, got {0}s")]
    NonPositiveTimestep(f64),
    #[error("maximum drift must be non-negative and finite, got {0}ms")]
    NegativeMaxDrift(f64),
}

/// Allocation, submission or completion failure on the device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device out of memory: {0}")]
    OutOfMemory(String),
    #[error("device validation failed: {0}")]
    Validation(String),
    #[error("device lost: {0}")]
    Lost(String),
    #[error("waiting for submitted work failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("presentation surface failed: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("device error: {0}")]
    Internal(String),
}

impl From<wgpu::Error> for DeviceError {
    fn from(error: wgpu::Error) -> Self {
        match error {
            wgpu::Error::OutOfMemory { .. } => DeviceError::OutOfMemory(error.to_string()),
            wgpu::Error::Validation { .. } => DeviceError::Validation(error.to_string()),
            other => DeviceError::Internal(other.to_string()),
        }
    }
}

/// Misuse of the frame loop lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("frame loop was stopped; construct a new loop to run again")]
    Terminated,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Loop(#[from] LoopError),
}
