//! Double-buffered GPU simulation state
//!
//! Each slot bundles the particle and grid buffers, so both fields swap roles
//! in lockstep on every commit.

use crate::config::SimulationConfig;
use crate::double_buffer::{PingPong, Slot};
use crate::error::DeviceError;
use bytemuck::Pod;
use glam::Vec3;
use rand::Rng;
use snow_physics::{
    grid_cell_count, seed_particles, GridCell, ParticleRecord, SeedSource, GRID_CELL_STRIDE,
    PARTICLE_STRIDE,
};
use wgpu::util::DeviceExt;

/// Simulated fields sharing the ping-pong discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Particles,
    Grid,
}

/// One slot's worth of storage
pub struct SimulationBuffers {
    pub particles: wgpu::Buffer,
    pub grid: wgpu::Buffer,
}

impl SimulationBuffers {
    pub fn buffer(&self, field: Field) -> &wgpu::Buffer {
        match field {
            Field::Particles => &self.particles,
            Field::Grid => &self.grid,
        }
    }

    /// Copy the particle records back to the host (blocking).
    pub fn read_particles(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<ParticleRecord>, DeviceError> {
        read_buffer(device, queue, &self.particles)
    }

    /// Copy the grid cells back to the host (blocking).
    pub fn read_grid(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<GridCell>, DeviceError> {
        read_buffer(device, queue, &self.grid)
    }
}

/// Copy a whole buffer back to the host through a staging buffer and block
/// until it is mapped.
pub fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
) -> Result<Vec<T>, DeviceError> {
    let size = buffer.size();
    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size);
    let submission = queue.submit(std::iter::once(encoder.finish()));

    let (sender, receiver) = std::sync::mpsc::channel();
    let slice = staging_buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::PollType::Wait {
        submission_index: Some(submission),
        timeout: None,
    })?;

    match receiver.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(DeviceError::Internal(e.to_string())),
        Err(_) => {
            return Err(DeviceError::Internal(
                "readback buffer was never mapped".to_string(),
            ))
        }
    }

    let values = {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&data).to_vec()
    };
    staging_buffer.unmap();

    Ok(values)
}

/// The ping-pong pair of simulation buffers
pub type SnowState = PingPong<SimulationBuffers>;

impl PingPong<SimulationBuffers> {
    /// Allocate both slots and seed the particles of slot A.
    pub fn allocate<R: Rng + ?Sized>(
        device: &wgpu::Device,
        config: &SimulationConfig,
        seed_points: Option<&[Vec3]>,
        rng: &mut R,
    ) -> (Self, SeedSource) {
        log::info!(
            "Allocating simulation state: {} particles, {}^3 grid",
            config.particle_count(),
            config.grid_resolution()
        );

        let (particles, source) =
            seed_particles(config.particle_count() as usize, seed_points, rng);
        log::info!("✓ Seeded particles ({:?})", source);

        let usage = wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        let particle_size = config.particle_count() as u64 * PARTICLE_STRIDE;
        let grid_size = grid_cell_count(config.grid_resolution()) * GRID_CELL_STRIDE;

        let particles_a = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer A"),
            contents: bytemuck::cast_slice(&particles),
            usage,
        });
        let particles_b = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer B"),
            size: particle_size,
            usage,
            mapped_at_creation: false,
        });
        let grid_a = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Buffer A"),
            size: grid_size,
            usage,
            mapped_at_creation: false,
        });
        let grid_b = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Buffer B"),
            size: grid_size,
            usage,
            mapped_at_creation: false,
        });

        log::info!("Buffers created");

        let state = PingPong::new(
            SimulationBuffers {
                particles: particles_a,
                grid: grid_a,
            },
            SimulationBuffers {
                particles: particles_b,
                grid: grid_b,
            },
        );
        (state, source)
    }

    pub fn settled_buffer(&self, field: Field) -> &wgpu::Buffer {
        self.settled().buffer(field)
    }

    pub fn working_buffer(&self, field: Field) -> &wgpu::Buffer {
        self.working().buffer(field)
    }

    pub fn buffer_in(&self, slot: Slot, field: Field) -> &wgpu::Buffer {
        self.slot(slot).buffer(field)
    }
}
