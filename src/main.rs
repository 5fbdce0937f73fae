//! Snow Simulation
//!
//! Fixed-timestep GPU snow simulation with a point-rendered view of the
//! settled state.

use glam::Vec3;
use snow_physics::{sample_points_in_volume, sphere_mesh};
use snow_renderer::{OrbitCamera, PointRenderer, SurfaceTarget};
use snow_simulation::{
    ConfigError, FrameHost, FrameLoop, GpuContext, GpuSimulationStep, GpuUniforms,
    SimulationBuffers, SimulationConfig, SnowState, TickReport, TickToken,
};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const PARTICLE_COUNT: u32 = 65_536;
const GRID_RESOLUTION: u32 = 64;
const TIMESTEP_S: f32 = 1.0 / 120.0;
const MAX_DRIFT_MS: f64 = 1_000.0;

const SNOWBALL_CENTER: Vec3 = Vec3::new(1.0, 1.0, 1.2);
const SNOWBALL_RADIUS: f32 = 0.4;

#[derive(Debug, thiserror::Error)]
enum InitError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported texture format")]
    NoSurfaceFormat,
    #[error("surface reports no supported alpha mode")]
    NoAlphaMode,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Seed points sampled inside a snowball mesh
fn snowball_points(count: usize) -> Vec<Vec3> {
    let mesh = sphere_mesh(SNOWBALL_CENTER, SNOWBALL_RADIUS, 16, 32);
    let samples = sample_points_in_volume(&mesh, count, &mut rand::rng());
    log::info!(
        "✓ Sampled {} snowball points in {} attempts",
        samples.inside,
        samples.attempts
    );
    samples.points
}

/// Prefers an sRGB format; an incompatible surface reports empty lists.
fn surface_format_and_alpha(
    caps: &wgpu::SurfaceCapabilities,
) -> Result<(wgpu::TextureFormat, wgpu::CompositeAlphaMode), InitError> {
    let format = caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .or(caps.formats.first())
        .copied()
        .ok_or(InitError::NoSurfaceFormat)?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .ok_or(InitError::NoAlphaMode)?;
    Ok((format, alpha_mode))
}

/// Drives ticks off window redraws
struct WinitHost {
    window: Arc<Window>,
    epoch: Instant,
    next_token: u64,
    pending: Option<TickToken>,
}

impl WinitHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            epoch: Instant::now(),
            next_token: 0,
            pending: None,
        }
    }

    fn take_pending(&mut self) -> Option<TickToken> {
        self.pending.take()
    }
}

impl FrameHost for WinitHost {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn request_tick(&mut self) -> TickToken {
        let token = TickToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(token);
        self.window.request_redraw();
        token
    }

    fn cancel_tick(&mut self, token: TickToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }
}

type SnowLoop =
    FrameLoop<SimulationBuffers, GpuSimulationStep, PointRenderer, SurfaceTarget, WinitHost>;

struct GpuState {
    gpu: GpuContext,
    frame_loop: SnowLoop,
    camera: OrbitCamera,
    last_title_update: Instant,
}

impl GpuState {
    async fn new(window: Arc<Window>) -> Result<Self, InitError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let (surface_format, alpha_mode) =
            surface_format_and_alpha(&surface.get_capabilities(&adapter))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let config =
            SimulationConfig::new(PARTICLE_COUNT, GRID_RESOLUTION, TIMESTEP_S, MAX_DRIFT_MS)?;

        let gpu = GpuContext::new(device, queue);
        let uniforms = Rc::new(GpuUniforms::new(&gpu.device));

        let seed_points = snowball_points(config.particle_count() as usize);
        let (state, _source) = SnowState::allocate(
            &gpu.device,
            &config,
            Some(&seed_points),
            &mut rand::rng(),
        );

        let compute = GpuSimulationStep::new(gpu.clone(), uniforms.clone(), PARTICLE_COUNT);
        let renderer =
            PointRenderer::new(gpu.clone(), uniforms, &surface_config, PARTICLE_COUNT);
        let target = SurfaceTarget::new(gpu.clone(), surface, surface_config);
        let host = WinitHost::new(window);

        let frame_loop = FrameLoop::new(&config, state, compute, renderer, target, host)?;

        Ok(Self {
            gpu,
            frame_loop,
            camera: OrbitCamera::new(size.width, size.height),
            last_title_update: Instant::now(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.frame_loop
            .target_mut()
            .resize(new_size.width, new_size.height);
        self.frame_loop
            .renderer_mut()
            .resize(new_size.width, new_size.height);
        self.camera.resize(new_size.width, new_size.height);
    }

    fn log_settled_summary(&self) {
        let settled = self.frame_loop.state().settled();
        match settled.read_particles(&self.gpu.device, &self.gpu.queue) {
            Ok(particles) if !particles.is_empty() => {
                let mean_height = particles.iter().map(|p| p.position().z).sum::<f32>()
                    / particles.len() as f32;
                log::info!(
                    "Settled state after {} steps: mean particle height {:.3}",
                    self.frame_loop.schedule().steps,
                    mean_height
                );
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read back settled particles: {}", e),
        }
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), InitError> {
        let window_attributes = Window::default_attributes()
            .with_title("Snow Simulation")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        self.window = Some(window.clone());

        let mut gpu_state = pollster::block_on(GpuState::new(window))?;
        if let Err(e) = gpu_state.frame_loop.start() {
            log::error!("Failed to start frame loop: {}", e);
        }
        self.gpu_state = Some(gpu_state);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(gpu_state) = &mut self.gpu_state {
            gpu_state.frame_loop.stop();
            gpu_state.log_settled_summary();
        }
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) else {
            return;
        };
        // Redraws not requested by the frame loop (expose, resize) are dropped.
        let Some(token) = gpu_state.frame_loop.host_mut().take_pending() else {
            return;
        };

        match gpu_state.frame_loop.tick(token, &gpu_state.camera) {
            Ok(
                TickReport::Rendered { catch_up, .. } | TickReport::FrameDropped { catch_up, .. },
            ) => {
                if let Some(anomaly) = catch_up {
                    log::warn!(
                        "Fell {:?} behind, skipped {} steps",
                        anomaly.drift,
                        anomaly.skipped_steps
                    );
                }
                if gpu_state.last_title_update.elapsed() >= Duration::from_millis(500) {
                    gpu_state.last_title_update = Instant::now();
                    window.set_title(&format!(
                        "Snow Simulation - step {} - {} particles",
                        gpu_state.frame_loop.schedule().steps,
                        PARTICLE_COUNT
                    ));
                }
            }
            Ok(TickReport::Skipped) => {}
            Err(e) => {
                log::error!("Simulation stopped: {}", e);
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Initialization failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.shutdown(event_loop),

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left || button == MouseButton::Right {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some(last_pos) = self.last_mouse_pos {
                        let delta_x = (position.x - last_pos.0) as f32;
                        let delta_y = (position.y - last_pos.1) as f32;

                        if let Some(gpu_state) = &mut self.gpu_state {
                            gpu_state.camera.rotate(delta_x, delta_y);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_x, y) => y * 10.0,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };

                if let Some(gpu_state) = &mut self.gpu_state {
                    let radius = gpu_state.camera.radius;
                    gpu_state.camera.zoom(-scroll * radius / 100.0);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting snow simulation...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App {
        window: None,
        gpu_state: None,
        mouse_pressed: false,
        last_mouse_pos: None,
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_format_prefers_srgb() {
        let caps = wgpu::SurfaceCapabilities {
            formats: vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
            ],
            ..Default::default()
        };

        let (format, alpha_mode) = surface_format_and_alpha(&caps).unwrap();

        assert_eq!(format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(alpha_mode, wgpu::CompositeAlphaMode::Opaque);
    }

    #[test]
    fn empty_surface_capabilities_fail_init() {
        let no_formats = wgpu::SurfaceCapabilities::default();
        assert!(matches!(
            surface_format_and_alpha(&no_formats),
            Err(InitError::NoSurfaceFormat)
        ));

        let no_alpha = wgpu::SurfaceCapabilities {
            formats: vec![wgpu::TextureFormat::Rgba8Unorm],
            alpha_modes: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            surface_format_and_alpha(&no_alpha),
            Err(InitError::NoAlphaMode)
        ));
    }
}
