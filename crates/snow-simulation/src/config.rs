//! Construction-time simulation parameters

use crate::error::ConfigError;
use std::time::Duration;

/// Validated parameters for one simulation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    particle_count: u32,
    grid_resolution: u32,
    timestep_s: f32,
    max_drift_ms: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 65_536,
            grid_resolution: 64,
            timestep_s: 1.0 / 120.0,
            max_drift_ms: 1_000.0,
        }
    }
}

impl SimulationConfig {
    pub fn new(
        particle_count: u32,
        grid_resolution: u32,
        timestep_s: f32,
        max_drift_ms: f64,
    ) -> Result<Self, ConfigError> {
        if particle_count == 0 {
            return Err(ConfigError::NonPositiveParticleCount);
        }
        if grid_resolution == 0 {
            return Err(ConfigError::NonPositiveGridResolution);
        }
        if !(timestep_s.is_finite() && timestep_s > 0.0) || micros(timestep_s as f64) == 0 {
            return Err(ConfigError::NonPositiveTimestep(timestep_s as f64));
        }
        if !(max_drift_ms.is_finite() && max_drift_ms >= 0.0) {
            return Err(ConfigError::NegativeMaxDrift(max_drift_ms));
        }

        Ok(Self {
            particle_count,
            grid_resolution,
            timestep_s,
            max_drift_ms,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn grid_resolution(&self) -> u32 {
        self.grid_resolution
    }

    /// Simulation timestep in seconds (as written into the uniforms)
    pub fn timestep_s(&self) -> f32 {
        self.timestep_s
    }

    /// Simulation timestep rounded to whole microseconds
    pub fn timestep(&self) -> Duration {
        Duration::from_micros(micros(self.timestep_s as f64))
    }

    /// Drift ceiling before a catch-up correction kicks in
    pub fn max_drift(&self) -> Duration {
        Duration::from_micros(micros(self.max_drift_ms / 1e3))
    }
}

// f32 seconds carry noise below the microsecond (0.016f32 is 16.00000076ms),
// so scheduling works on whole microseconds.
fn micros(seconds: f64) -> u64 {
    (seconds * 1e6).round() as u64
}
