//! Compute stage: one simulation step per invocation

use crate::error::DeviceError;
use crate::gpu::GpuContext;
use crate::state::{Field, SimulationBuffers};
use crate::uniforms::{GpuUniforms, Uniforms};
use snow_physics::workgroup_count;
use std::rc::Rc;

/// Advances the simulation by one timestep.
///
/// `step` reads only `settled` and writes only `working`. Returning means the
/// device has finished the step; only then may the caller commit.
pub trait ComputeStage<S> {
    /// Upload this tick's uniforms. Called once per tick, before any step or render.
    fn write_uniforms(&mut self, uniforms: &Uniforms) -> Result<(), DeviceError>;

    fn step(
        &mut self,
        settled: &S,
        working: &mut S,
        uniforms: &Uniforms,
    ) -> Result<(), DeviceError>;
}

/// GPU simulation step over the ping-pong particle/grid buffers
///
/// A step is two dispatches over the particles: `scatter_to_grid` rebuilds the
/// working grid from the settled particles, then `simulation_step` blends each
/// particle's velocity with the new grid and the settled grid before
/// integrating it into the working particle slot.
pub struct GpuSimulationStep {
    gpu: GpuContext,
    uniforms: Rc<GpuUniforms>,
    scatter_pipeline: wgpu::ComputePipeline,
    step_pipeline: wgpu::ComputePipeline,
    storage_bind_group_layout: wgpu::BindGroupLayout,
    particle_count: u32,
}

impl GpuSimulationStep {
    pub fn new(gpu: GpuContext, uniforms: Rc<GpuUniforms>, particle_count: u32) -> Self {
        log::info!("Initializing simulation step pipelines...");
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Simulation Step Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/simulation_step.wgsl").into()),
        });

        // 0: particles in (settled), 1: particles out (working)
        // 2: grid in (settled),      3: grid out (working)
        let storage_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Simulation Step Storage Bind Group Layout"),
                entries: &[
                    storage_entry(0, true),
                    storage_entry(1, false),
                    storage_entry(2, true),
                    storage_entry(3, false),
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Step Pipeline Layout"),
            bind_group_layouts: &[uniforms.bind_group_layout(), &storage_bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let scatter_pipeline = create_pipeline("Grid Scatter Pipeline", "scatter_to_grid");
        let step_pipeline = create_pipeline("Simulation Step Pipeline", "simulation_step");

        log::info!("Pipelines created");

        Self {
            gpu,
            uniforms,
            scatter_pipeline,
            step_pipeline,
            storage_bind_group_layout,
            particle_count,
        }
    }

    fn storage_bind_group(
        &self,
        settled: &SimulationBuffers,
        working: &SimulationBuffers,
    ) -> wgpu::BindGroup {
        fn entry(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
            wgpu::BindGroupEntry {
                binding,
                resource: buffer.as_entire_binding(),
            }
        }

        self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulation Step Storage Bind Group"),
            layout: &self.storage_bind_group_layout,
            entries: &[
                entry(0, settled.buffer(Field::Particles)),
                entry(1, working.buffer(Field::Particles)),
                entry(2, settled.buffer(Field::Grid)),
                entry(3, working.buffer(Field::Grid)),
            ],
        })
    }
}

impl ComputeStage<SimulationBuffers> for GpuSimulationStep {
    fn write_uniforms(&mut self, uniforms: &Uniforms) -> Result<(), DeviceError> {
        self.uniforms.write(&self.gpu, uniforms)
    }

    fn step(
        &mut self,
        settled: &SimulationBuffers,
        working: &mut SimulationBuffers,
        _uniforms: &Uniforms,
    ) -> Result<(), DeviceError> {
        let workgroups = workgroup_count(self.particle_count);

        self.gpu.submit_and_wait("Simulation Step Encoder", |encoder| {
            let bind_group = self.storage_bind_group(settled, working);

            // Grid is rebuilt from scratch every step.
            encoder.clear_buffer(working.buffer(Field::Grid), 0, None);

            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Simulation Step Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
            compute_pass.set_bind_group(1, &bind_group, &[]);

            compute_pass.set_pipeline(&self.scatter_pipeline);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);

            compute_pass.set_pipeline(&self.step_pipeline);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        })
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
