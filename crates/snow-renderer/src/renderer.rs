//! Point rendering of the settled particle buffer

use snow_physics::PARTICLE_STRIDE;
use snow_simulation::{
    DeviceError, GpuContext, GpuUniforms, RenderStage, SimulationBuffers, Uniforms,
};
use std::rc::Rc;

use crate::target::SurfaceFrame;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct PointRenderer {
    gpu: GpuContext,
    uniforms: Rc<GpuUniforms>,
    render_pipeline: wgpu::RenderPipeline,
    depth_texture: wgpu::TextureView,
    particle_count: u32,
    clear_color: wgpu::Color,
}

impl PointRenderer {
    pub fn new(
        gpu: GpuContext,
        uniforms: Rc<GpuUniforms>,
        surface_config: &wgpu::SurfaceConfiguration,
        particle_count: u32,
    ) -> Self {
        let device = &gpu.device;

        let depth_texture =
            Self::create_depth_texture(device, surface_config.width, surface_config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[uniforms.bind_group_layout()],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vert"),
                // Particle records are read in place; only the position vec4 is consumed.
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: PARTICLE_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x4],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("frag"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!("✓ Point renderer initialized");

        Self {
            gpu,
            uniforms,
            render_pipeline,
            depth_texture,
            particle_count,
            clear_color: background_color(),
        }
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(&self.gpu.device, width, height);
    }
}

impl RenderStage<SimulationBuffers, SurfaceFrame> for PointRenderer {
    fn render(
        &mut self,
        settled: &SimulationBuffers,
        _uniforms: &Uniforms,
        frame: &SurfaceFrame,
    ) -> Result<(), DeviceError> {
        self.gpu.submit_and_wait("Render Encoder", |encoder| {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
            render_pass.set_vertex_buffer(0, settled.particles.slice(..));
            render_pass.draw(0..self.particle_count, 0..1);
        })
    }
}

/// Catppuccin Mocha base, converted to linear for an sRGB surface
fn background_color() -> wgpu::Color {
    let base = catppuccin::PALETTE.mocha.colors.base.rgb;
    wgpu::Color {
        r: srgb_to_linear(base.r),
        g: srgb_to_linear(base.g),
        b: srgb_to_linear(base.b),
        a: 1.0,
    }
}

fn srgb_to_linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_map_to_linear_endpoints() {
        assert_eq!(srgb_to_linear(0), 0.0);
        assert!((srgb_to_linear(255) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn background_matches_mocha_base() {
        // #1e1e2e
        let color = background_color();
        assert!((color.r - 0.01298).abs() < 1e-4);
        assert!((color.b - 0.02732).abs() < 1e-4);
        assert_eq!(color.a, 1.0);
    }
}
