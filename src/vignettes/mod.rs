//! Built-in verse vignettes.
//!
//! Each module is one independent scene. They share nothing but the helpers
//! below and are registered in verse order by [`register_builtin`].

pub mod decay;
pub mod entanglement;
pub mod lotus;
pub mod superposition;

use glam::Vec3;
use rand::Rng;

use crate::scene::SceneHost;

pub use decay::Decay;
pub use entanglement::Entanglement;
pub use lotus::Lotus;
pub use superposition::Superposition;

/// Register the built-in verses in navigation order.
pub fn register_builtin(host: &mut SceneHost) {
    host.register_vignette("superposition", Superposition::new);
    host.register_vignette("entanglement", Entanglement::new);
    host.register_vignette("decay", Decay::new);
    host.register_vignette("lotus", Lotus::new);
}

/// Uniform point inside a ball of `radius`.
pub(crate) fn random_in_ball(rng: &mut impl Rng, radius: f32) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p * radius;
        }
    }
}

/// Uniform unit vector.
pub(crate) fn random_direction(rng: &mut impl Rng) -> Vec3 {
    loop {
        let p = random_in_ball(rng, 1.0);
        if p.length_squared() > 1e-4 {
            return p.normalize();
        }
    }
}

/// How many spawns a Poisson-ish emitter makes this frame: the whole part of
/// `rate * dt`, plus one more with probability equal to the fraction.
pub(crate) fn spawn_count(rng: &mut impl Rng, rate: f32, dt: f32) -> usize {
    let expected = (rate * dt).max(0.0);
    let whole = expected.floor();
    let extra = rng.gen_bool(f64::from(expected - whole).clamp(0.0, 1.0));
    whole as usize + usize::from(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn ball_points_stay_inside() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        for _ in 0..200 {
            assert!(random_in_ball(&mut rng, 2.0).length() <= 2.0 + 1e-5);
            assert!((random_direction(&mut rng).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn spawn_count_tracks_rate() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        assert_eq!(spawn_count(&mut rng, 0.0, 1.0), 0);
        assert_eq!(spawn_count(&mut rng, 4.0, 1.5), 6);
        let total: usize = (0..1000).map(|_| spawn_count(&mut rng, 30.0, 0.01)).sum();
        assert!((200..400).contains(&total));
    }
}
