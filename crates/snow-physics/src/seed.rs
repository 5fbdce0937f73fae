//! Initial particle placement
//!
//! Seed points come from an external sampler (e.g. mesh volume sampling). When
//! they are missing or too few, every particle falls back to a uniform draw in
//! the `[0, FALLBACK_BOX_EXTENT)^3` box.

use crate::constants::FALLBACK_BOX_EXTENT;
use crate::particle::ParticleRecord;
use glam::Vec3;
use rand::Rng;

/// Where the initial particle positions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Provided,
    RandomBox,
}

/// Build `count` particle records from optional seed points.
pub fn seed_particles<R: Rng + ?Sized>(
    count: usize,
    seed_points: Option<&[Vec3]>,
    rng: &mut R,
) -> (Vec<ParticleRecord>, SeedSource) {
    match seed_points {
        Some(points) if points.len() >= count => {
            let particles = points[..count]
                .iter()
                .map(|&p| ParticleRecord::at_rest(p))
                .collect();
            (particles, SeedSource::Provided)
        }
        other => {
            if let Some(points) = other {
                log::warn!(
                    "Seed provider supplied {} points for {} particles, falling back to random box",
                    points.len(),
                    count
                );
            }
            let particles = (0..count)
                .map(|_| {
                    ParticleRecord::at_rest(Vec3::new(
                        rng.random::<f32>() * FALLBACK_BOX_EXTENT,
                        rng.random::<f32>() * FALLBACK_BOX_EXTENT,
                        rng.random::<f32>() * FALLBACK_BOX_EXTENT,
                    ))
                })
                .collect();
            (particles, SeedSource::RandomBox)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lattice(n: usize) -> Vec<Vec3> {
        (0..n)
            .map(|i| Vec3::new(i as f32 * 0.25, -(i as f32), 10.0 + i as f32))
            .collect()
    }

    #[test]
    fn provided_points_are_copied_verbatim() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = lattice(1000);

        let (particles, source) = seed_particles(1000, Some(&points), &mut rng);

        assert_eq!(source, SeedSource::Provided);
        assert_eq!(particles.len(), 1000);
        for (particle, point) in particles.iter().zip(&points) {
            assert_eq!(particle.position(), *point);
            assert_eq!(particle.position[3], 1.0);
        }
    }

    #[test]
    fn surplus_points_are_truncated() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = lattice(10);

        let (particles, source) = seed_particles(4, Some(&points), &mut rng);

        assert_eq!(source, SeedSource::Provided);
        assert_eq!(particles.len(), 4);
        assert_eq!(particles[3].position(), points[3]);
    }

    #[test]
    fn undersized_points_fall_back_to_random_box() {
        let mut rng = StdRng::seed_from_u64(42);
        let points = lattice(999);

        let (particles, source) = seed_particles(1000, Some(&points), &mut rng);

        assert_eq!(source, SeedSource::RandomBox);
        assert_eq!(particles.len(), 1000);
        for particle in &particles {
            for &c in &particle.position[..3] {
                assert!(
                    (0.0..FALLBACK_BOX_EXTENT).contains(&c),
                    "coordinate {c} out of box"
                );
            }
            assert_eq!(particle.position[3], 1.0);
        }
    }

    #[test]
    fn missing_points_fall_back_to_random_box() {
        let mut rng = StdRng::seed_from_u64(1);

        let (particles, source) = seed_particles(256, None, &mut rng);

        assert_eq!(source, SeedSource::RandomBox);
        assert!(particles
            .iter()
            .all(|p| p.position[..3].iter().all(|c| (0.0..2.0).contains(c))));
    }
}
