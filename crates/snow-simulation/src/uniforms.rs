//! Per-tick uniforms shared by the compute and render stages

use crate::error::DeviceError;
use crate::gpu::GpuContext;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Uniform block (matches `Uniforms` in the WGSL sources)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view_proj_inv: [[f32; 4]; 4],
    pub simulation_timestep_s: f32,
    /// Cells per axis of the simulation grid
    pub grid_resolution: u32,
    pub _padding: [u32; 2],
}

impl Uniforms {
    pub fn new(
        view_proj: Mat4,
        view_proj_inv: Mat4,
        simulation_timestep_s: f32,
        grid_resolution: u32,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            view_proj_inv: view_proj_inv.to_cols_array_2d(),
            simulation_timestep_s,
            grid_resolution,
            _padding: [0; 2],
        }
    }
}

impl Default for Uniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, 0.0, 0)
    }
}

/// Uniform buffer plus the bind group both pipelines use at group 0
pub struct GpuUniforms {
    buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GpuUniforms {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Uniforms Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Snow Uniforms Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE
                    | wgpu::ShaderStages::VERTEX
                    | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Snow Uniforms Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    /// Queue the uniforms; ordered before any later submission on the queue.
    pub fn write(&self, gpu: &GpuContext, uniforms: &Uniforms) -> Result<(), DeviceError> {
        gpu.scoped(|| {
            gpu.queue
                .write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniforms]))
        })
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
