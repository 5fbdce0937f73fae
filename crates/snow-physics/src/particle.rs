//! GPU record types for particles and grid cells

use crate::constants::{DOMAIN_EXTENT, GRID_FIXED_POINT_SCALE};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// GPU-compatible particle record
/// Aligned for WGSL struct compatibility (3 x vec4<f32>)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    /// xyz = position, w = homogeneous/mass coordinate
    pub position: [f32; 4],
    /// xyz = velocity, w unused
    pub velocity: [f32; 4],
    /// x = deformation gradient determinant, y = plastic hardening, zw unused
    pub deformation: [f32; 4],
}

impl ParticleRecord {
    /// Particle at rest with an undeformed state
    pub fn at_rest(position: Vec3) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            velocity: [0.0; 4],
            deformation: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }
}

/// One grid cell: momentum and mass scattered from the particles, rebuilt
/// every step. Both are fixed-point (`GRID_FIXED_POINT_SCALE`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GridCell {
    pub momentum: [i32; 3],
    pub mass: i32,
}

impl GridCell {
    pub fn mass(&self) -> f32 {
        self.mass as f32 / GRID_FIXED_POINT_SCALE
    }

    /// Mass-weighted velocity, `None` for an empty cell
    pub fn velocity(&self) -> Option<Vec3> {
        if self.mass <= 0 {
            return None;
        }
        let [x, y, z] = self.momentum;
        Some(Vec3::new(x as f32, y as f32, z as f32) / self.mass as f32)
    }
}

/// Total number of cells in a cubic grid of the given resolution
pub fn grid_cell_count(resolution: u32) -> u64 {
    let r = resolution as u64;
    r * r * r
}

/// Flatten a 3D cell coordinate into a linear index (`x + y*r + z*r*r`).
///
/// Returns `None` for coordinates outside the grid.
pub fn grid_index(x: u32, y: u32, z: u32, resolution: u32) -> Option<usize> {
    if x >= resolution || y >= resolution || z >= resolution {
        return None;
    }
    let r = resolution as usize;
    Some(x as usize + y as usize * r + z as usize * r * r)
}

/// Cell containing `position`, or `None` outside the domain.
pub fn cell_index_of(position: Vec3, resolution: u32) -> Option<usize> {
    if resolution == 0 {
        return None;
    }
    let cell = (position / (DOMAIN_EXTENT / resolution as f32)).floor();
    if cell.min_element() < 0.0 || position.max_element() > DOMAIN_EXTENT {
        return None;
    }
    // The far wall belongs to the last cell.
    let last = resolution - 1;
    grid_index(
        (cell.x as u32).min(last),
        (cell.y as u32).min(last),
        (cell.z as u32).min(last),
        resolution,
    )
}
