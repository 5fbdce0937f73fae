//! Seed points sampled from a triangle mesh
//!
//! Meshes are plain triangle soups. Volume sampling assumes the mesh is closed;
//! open or degenerate meshes simply reject every candidate and end up filled
//! from the bounding box.

use glam::Vec3;
use rand::Rng;

/// Rejection sampling gives up after this many candidates per requested point.
pub const VOLUME_ATTEMPTS_PER_POINT: usize = 64;

const RAY_EPSILON: f32 = 1e-7;

pub type Triangle = [Vec3; 3];

/// Result of `sample_points_in_volume`
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSamples {
    pub points: Vec<Vec3>,
    /// Leading points that passed the inside test; the rest fill from the bounding box
    pub inside: usize,
    pub attempts: usize,
}

/// Axis-aligned bounds of every vertex, `None` for an empty mesh
pub fn mesh_bounds(triangles: &[Triangle]) -> Option<(Vec3, Vec3)> {
    let mut vertices = triangles.iter().flatten();
    let first = *vertices.next()?;
    Some(vertices.fold((first, first), |(min, max), &v| (min.min(v), max.max(v))))
}

/// Uniform point on a triangle (barycentric, folded back into the triangle)
pub fn sample_point_in_triangle<R: Rng + ?Sized>(triangle: &Triangle, rng: &mut R) -> Vec3 {
    let mut u = rng.random::<f32>();
    let mut v = rng.random::<f32>();
    if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
    }
    let w = 1.0 - u - v;
    let [a, b, c] = *triangle;
    a * w + b * u + c * v
}

/// `count` points on the mesh surface. Triangles are picked uniformly, not by area.
pub fn sample_points_on_surface<R: Rng + ?Sized>(
    triangles: &[Triangle],
    count: usize,
    rng: &mut R,
) -> Vec<Vec3> {
    if triangles.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            let triangle = &triangles[rng.random_range(0..triangles.len())];
            sample_point_in_triangle(triangle, rng)
        })
        .collect()
}

/// Möller-Trumbore; only hits in front of the origin count.
pub fn ray_intersects_triangle(origin: Vec3, direction: Vec3, triangle: &Triangle) -> bool {
    let [v0, v1, v2] = *triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < RAY_EPSILON {
        return false;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    f * edge2.dot(q) > RAY_EPSILON
}

/// Even-odd test with a ray cast along +x.
pub fn point_inside_mesh(point: Vec3, triangles: &[Triangle]) -> bool {
    let crossings = triangles
        .iter()
        .filter(|triangle| ray_intersects_triangle(point, Vec3::X, triangle))
        .count();
    crossings % 2 == 1
}

/// `count` points inside a closed mesh by rejection sampling its bounding box.
///
/// After `count * VOLUME_ATTEMPTS_PER_POINT` candidates the remaining points are
/// drawn from the bounding box without the inside test. An empty mesh yields no
/// points.
pub fn sample_points_in_volume<R: Rng + ?Sized>(
    triangles: &[Triangle],
    count: usize,
    rng: &mut R,
) -> VolumeSamples {
    let Some((min, max)) = mesh_bounds(triangles) else {
        log::warn!("Cannot sample the volume of an empty mesh");
        return VolumeSamples {
            points: Vec::new(),
            inside: 0,
            attempts: 0,
        };
    };
    let extent = max - min;
    let in_bounds =
        |rng: &mut R| min + extent * Vec3::new(rng.random(), rng.random(), rng.random());

    let max_attempts = count * VOLUME_ATTEMPTS_PER_POINT;
    let mut points = Vec::with_capacity(count);
    let mut attempts = 0;
    while points.len() < count && attempts < max_attempts {
        let candidate = in_bounds(rng);
        if point_inside_mesh(candidate, triangles) {
            points.push(candidate);
        }
        attempts += 1;
    }

    let inside = points.len();
    if inside < count {
        log::warn!(
            "Volume sampling found {} of {} points in {} attempts, filling from bounding box",
            inside,
            count,
            attempts
        );
        points.extend((inside..count).map(|_| in_bounds(rng)));
    }

    VolumeSamples {
        points,
        inside,
        attempts,
    }
}

/// Closed triangle soup of an axis-aligned box
pub fn box_mesh(min: Vec3, max: Vec3) -> Vec<Triangle> {
    // Corner `i` takes max on axis `k` when bit `k` of `i` is set.
    let corner = |i: usize| {
        Vec3::new(
            if i & 1 != 0 { max.x } else { min.x },
            if i & 2 != 0 { max.y } else { min.y },
            if i & 4 != 0 { max.z } else { min.z },
        )
    };
    const FACES: [[usize; 4]; 6] = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];

    FACES
        .iter()
        .flat_map(|&[a, b, c, d]| {
            [
                [corner(a), corner(b), corner(c)],
                [corner(a), corner(c), corner(d)],
            ]
        })
        .collect()
}

/// Closed UV sphere with `stacks` bands from pole to pole and `slices` around.
///
/// Pole bands emit one triangle per slice so no degenerate triangles are produced.
pub fn sphere_mesh(center: Vec3, radius: f32, stacks: usize, slices: usize) -> Vec<Triangle> {
    let stacks = stacks.max(2);
    let slices = slices.max(3);
    let vertex = |i: usize, j: usize| {
        let phi = std::f32::consts::PI * i as f32 / stacks as f32;
        let theta = std::f32::consts::TAU * j as f32 / slices as f32;
        center + radius * Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
    };

    let mut triangles = Vec::with_capacity(2 * stacks * slices);
    for i in 0..stacks {
        for j in 0..slices {
            let a = vertex(i, j);
            let b = vertex(i + 1, j);
            let c = vertex(i + 1, j + 1);
            let d = vertex(i, j + 1);
            if i != stacks - 1 {
                triangles.push([a, b, c]);
            }
            if i != 0 {
                triangles.push([a, c, d]);
            }
        }
    }
    triangles
}
