//! Orbit camera for 3D visualization
//!
//! Z-up orbit around a target point. Derived matrices are recomputed on every
//! read; there is no cached state to invalidate.

use glam::{Mat4, Vec3};
use snow_simulation::CameraView;
use std::f32::consts::{FRAC_PI_2, TAU};

/// Radians of orbit per pixel of drag
const ORBIT_CONTROL_SCALE: f32 = 0.005;

pub struct OrbitCamera {
    pub radius: f32,
    /// Latitude in `[0, 2π)`
    pub lat: f32,
    /// Longitude in `[0, 2π)`
    pub long: f32,
    pub offset: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

/// Wraps into `[0, 2π)`. `rem_euclid` rounds tiny negative angles up to 2π itself.
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

impl OrbitCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            radius: 4.0,
            lat: 0.3,
            long: 0.0,
            offset: Vec3::new(1.0, 1.0, 1.0),
            aspect: width as f32 / height.max(1) as f32,
            fovy: 45.0_f32.to_radians(),
            znear: 0.01,
            zfar: 100.0,
        }
    }

    pub fn orientation(&self) -> Mat4 {
        Mat4::from_rotation_z(-self.long) * Mat4::from_rotation_x(-self.lat + FRAC_PI_2)
    }

    pub fn position(&self) -> Vec3 {
        self.orientation()
            .transform_point3(Vec3::new(0.0, 0.0, self.radius))
            + self.offset
    }

    pub fn view(&self) -> Mat4 {
        (Mat4::from_translation(self.position()) * self.orientation()).inverse()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Orbit by a drag of `delta_x`, `delta_y` pixels.
    ///
    /// Past the poles the camera is upside-down, so horizontal drag reverses
    /// to keep the scene following the cursor.
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.lat = wrap_angle(self.lat + delta_y * ORBIT_CONTROL_SCALE);

        let upside_down = FRAC_PI_2 < self.lat && self.lat < 3.0 * FRAC_PI_2;
        let direction = if upside_down { -1.0 } else { 1.0 };
        self.long = wrap_angle(self.long + direction * delta_x * ORBIT_CONTROL_SCALE);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius + delta).clamp(0.1, 50.0);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }
}

impl CameraView for OrbitCamera {
    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}
