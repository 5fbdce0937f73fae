//! Layout and dispatch constants shared by the simulation and the renderer.

/// Byte stride of one `ParticleRecord` in the particle buffers
pub const PARTICLE_STRIDE: u64 = 48;

/// Byte stride of one `GridCell` in the grid buffers
pub const GRID_CELL_STRIDE: u64 = 16;

/// Threads per compute workgroup (must match `@workgroup_size` in WGSL)
pub const WORKGROUP_SIZE: u32 = 256;

/// The simulation domain is the cube `[0, DOMAIN_EXTENT]^3`, covered by the grid
pub const DOMAIN_EXTENT: f32 = 2.0;

/// Fallback seeding draws every coordinate from `[0, FALLBACK_BOX_EXTENT)`
pub const FALLBACK_BOX_EXTENT: f32 = DOMAIN_EXTENT;

/// Grid cells accumulate mass and momentum as fixed-point `i32` so the scatter
/// pass can use integer atomics. Must match `FIXED_POINT_SCALE` in WGSL.
pub const GRID_FIXED_POINT_SCALE: f32 = 4096.0;

/// Number of workgroups needed to cover `invocations` threads.
pub fn workgroup_count(invocations: u32) -> u32 {
    invocations.div_ceil(WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(0), 0);
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(256), 1);
        assert_eq!(workgroup_count(257), 2);
        assert_eq!(workgroup_count(1_000), 4);
    }
}
