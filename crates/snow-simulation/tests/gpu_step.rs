//! Headless GPU step tests
//!
//! Runs `GpuSimulationStep` against real ping-pong buffers and reads the slots
//! back. Skipped when no adapter is available.

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use snow_physics::{cell_index_of, GridCell, ParticleRecord};
use snow_simulation::{
    read_buffer, ComputeStage, DeviceError, Field, GpuContext, GpuSimulationStep, GpuUniforms,
    SimulationConfig, Slot, SnowState, Uniforms,
};
use std::rc::Rc;

const RESOLUTION: u32 = 8;
const TIMESTEP_S: f32 = 0.01;

fn headless_gpu() -> Option<GpuContext> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Test Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .ok()?;

        Some(GpuContext::new(device, queue))
    })
}

/// One particle at the center of each cell of an 8x8x4 block
fn cell_centers() -> Vec<Vec3> {
    let cell = 2.0 / RESOLUTION as f32;
    let mut points = Vec::new();
    for z in 2..6 {
        for y in 0..8 {
            for x in 0..8 {
                points.push((Vec3::new(x as f32, y as f32, z as f32) + 0.5) * cell);
            }
        }
    }
    points
}

struct Fixture {
    gpu: GpuContext,
    state: SnowState,
    compute: GpuSimulationStep,
    points: Vec<Vec3>,
}

impl Fixture {
    fn new(gpu: GpuContext) -> Self {
        let points = cell_centers();
        let count = points.len() as u32;
        let config = SimulationConfig::new(count, RESOLUTION, TIMESTEP_S, 1000.0).unwrap();

        let (state, _) = SnowState::allocate(
            &gpu.device,
            &config,
            Some(&points),
            &mut StdRng::seed_from_u64(0),
        );
        let uniforms = Rc::new(GpuUniforms::new(&gpu.device));
        let mut compute = GpuSimulationStep::new(gpu.clone(), uniforms, count);
        let block = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, TIMESTEP_S, RESOLUTION);
        compute.write_uniforms(&block).unwrap();

        Self {
            gpu,
            state,
            compute,
            points,
        }
    }

    fn step(&mut self) {
        let (settled, working) = self.state.split_mut();
        self.compute
            .step(settled, working, &Uniforms::default())
            .unwrap();
        self.state.commit();
    }

    fn grid(&self, buffer: &wgpu::Buffer) -> Vec<GridCell> {
        read_buffer(&self.gpu.device, &self.gpu.queue, buffer).unwrap()
    }

    fn particles(&self, buffer: &wgpu::Buffer) -> Vec<ParticleRecord> {
        read_buffer(&self.gpu.device, &self.gpu.queue, buffer).unwrap()
    }
}

fn total_mass(grid: &[GridCell]) -> f32 {
    grid.iter().map(GridCell::mass).sum()
}

#[test]
fn step_scatters_settled_particles_into_working_grid() {
    let Some(gpu) = headless_gpu() else {
        println!("SKIP: No GPU adapter available");
        return;
    };
    let mut f = Fixture::new(gpu);

    f.step();

    assert_eq!(f.state.settled_slot(), Slot::B);
    let grid = f.grid(f.state.settled_buffer(Field::Grid));
    assert_eq!(total_mass(&grid), f.points.len() as f32);
    for point in &f.points {
        let cell = grid[cell_index_of(*point, RESOLUTION).unwrap()];
        assert_eq!(cell.mass(), 1.0);
        assert_eq!(cell.velocity(), Some(Vec3::ZERO));
    }

    // The settled slot of the step was only read.
    let untouched = f.grid(f.state.working_buffer(Field::Grid));
    assert_eq!(total_mass(&untouched), 0.0);
    let seeded = f.particles(f.state.buffer_in(Slot::A, Field::Particles));
    for (particle, point) in seeded.iter().zip(&f.points) {
        assert_eq!(particle.position(), *point);
    }
}

#[test]
fn step_integrates_gravity_into_working_particles() {
    let Some(gpu) = headless_gpu() else {
        println!("SKIP: No GPU adapter available");
        return;
    };
    let mut f = Fixture::new(gpu);

    f.step();

    let particles = f.particles(f.state.settled_buffer(Field::Particles));
    assert_eq!(particles.len(), f.points.len());
    let dv = -9.81 * TIMESTEP_S;
    for (particle, point) in particles.iter().zip(&f.points) {
        assert!((particle.velocity[2] - dv).abs() < 1e-5);
        assert!((particle.position[2] - (point.z + dv * TIMESTEP_S)).abs() < 1e-5);
        assert_eq!(particle.position[0], point.x);
        assert_eq!(particle.position[3], 1.0);
    }
}

#[test]
fn second_step_rebuilds_the_other_grid_slot() {
    let Some(gpu) = headless_gpu() else {
        println!("SKIP: No GPU adapter available");
        return;
    };
    let mut f = Fixture::new(gpu);

    f.step();
    f.step();

    assert_eq!(f.state.settled_slot(), Slot::A);
    assert_eq!(f.state.commits(), 2);
    let grid = f.grid(f.state.settled_buffer(Field::Grid));
    assert_eq!(total_mass(&grid), f.points.len() as f32);
    // Scattered from the particles after one step of free fall.
    let falling = grid.iter().filter_map(GridCell::velocity).all(|v| v.z < 0.0);
    assert!(falling);
}

#[test]
fn scoped_work_reports_validation_errors() {
    let Some(gpu) = headless_gpu() else {
        println!("SKIP: No GPU adapter available");
        return;
    };

    let valid = gpu.scoped(|| {
        gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Valid Buffer"),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        })
    });
    assert!(valid.is_ok());

    // Mappable storage buffers need a feature the test device does not request.
    let invalid = gpu.scoped(|| {
        gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Invalid Buffer"),
            size: 16,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        })
    });
    assert!(matches!(invalid, Err(DeviceError::Validation(_))));

    // The device is still usable afterwards.
    let block = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, TIMESTEP_S, RESOLUTION);
    let uniforms = GpuUniforms::new(&gpu.device);
    assert!(uniforms.write(&gpu, &block).is_ok());
}
