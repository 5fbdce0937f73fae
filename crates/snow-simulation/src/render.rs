//! Render-side interfaces consumed by the frame loop

use crate::error::DeviceError;
use crate::uniforms::Uniforms;
use glam::Mat4;

/// Camera capability, read once per tick
pub trait CameraView {
    fn view_projection(&self) -> Mat4;

    fn inverse_view_projection(&self) -> Mat4 {
        self.view_projection().inverse()
    }
}

/// Supplies the surface to draw into each tick
pub trait PresentationTarget {
    type Frame;

    /// `Ok(None)` when no frame is available right now (timeout, outdated or
    /// occluded surface); the tick then skips rendering and carries on.
    fn acquire(&mut self) -> Result<Option<Self::Frame>, DeviceError>;

    fn present(&mut self, frame: Self::Frame);
}

/// Draws the settled state into a frame.
///
/// Must never be handed a working slot; returning means the device has
/// finished drawing.
pub trait RenderStage<S, F> {
    fn render(&mut self, settled: &S, uniforms: &Uniforms, frame: &F) -> Result<(), DeviceError>;
}
