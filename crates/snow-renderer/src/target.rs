//! Window surface as a presentation target

use snow_simulation::{DeviceError, GpuContext, PresentationTarget};

/// A surface texture acquired for one frame, with its color view
pub struct SurfaceFrame {
    pub texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

pub struct SurfaceTarget {
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    /// Configures `surface` with `config` before handing it to the loop.
    pub fn new(
        gpu: GpuContext,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(&gpu.device, &config);
        Self {
            gpu,
            surface,
            config,
        }
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    /// Zero-sized windows (minimized) keep the previous configuration.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.gpu.device, &self.config);
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.gpu.device, &self.config);
    }
}

/// What `acquire` does with a failed `get_current_texture`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Reconfigure,
    SkipFrame,
    Fatal,
}

fn recovery(err: &wgpu::SurfaceError) -> Recovery {
    match err {
        wgpu::SurfaceError::OutOfMemory => Recovery::Fatal,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Recovery::Reconfigure,
        _ => Recovery::SkipFrame,
    }
}

impl PresentationTarget for SurfaceTarget {
    type Frame = SurfaceFrame;

    /// Lost or outdated surfaces are reconfigured and retried once. Anything
    /// short of running out of memory drops the frame instead of failing.
    fn acquire(&mut self) -> Result<Option<SurfaceFrame>, DeviceError> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                if recovery(&err) == Recovery::Reconfigure {
                    log::warn!("Surface {err}, reconfiguring");
                    self.reconfigure();
                    match self.surface.get_current_texture() {
                        Ok(texture) => texture,
                        Err(err) => return skip_or_fail(err),
                    }
                } else {
                    return skip_or_fail(err);
                }
            }
        };

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Some(SurfaceFrame { texture, view }))
    }

    fn present(&mut self, frame: SurfaceFrame) {
        frame.texture.present();
    }
}

fn skip_or_fail(err: wgpu::SurfaceError) -> Result<Option<SurfaceFrame>, DeviceError> {
    if recovery(&err) == Recovery::Fatal {
        return Err(err.into());
    }
    log::warn!("No surface texture this frame: {err}");
    Ok(None)
}
