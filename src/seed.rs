use std::f32::consts::TAU;

use crate::{body::Body, universe::Universe};
use ultraviolet::Vec2;

/// Produces the initial population of a universe one body at a time.
///
/// The universe passed in is not yet populated; strategies may read its
/// constants (such as the gravitational constant).
pub trait SeedStrategy {
    fn next_body(&mut self, universe: &Universe) -> Body;
}

/// Position at `distance` along angle `theta`, and the velocity of a circular
/// orbit of the given `speed` around the origin (clockwise).
fn orbit(theta: f32, distance: f32, speed: f32) -> (Vec2, Vec2) {
    let (sin, cos) = theta.sin_cos();
    (Vec2::new(cos, sin) * distance, Vec2::new(sin, -cos) * speed)
}

fn range(rng: &mut fastrand::Rng, min: f32, max: f32) -> f32 {
    rng.f32() * (max - min) + min
}

/// Equal-mass bodies scattered uniformly over a square around the origin,
/// each moving in a random direction.
#[derive(Debug)]
pub struct RandomSeed {
    rng: fastrand::Rng,
}

impl RandomSeed {
    pub const AMPLITUDE: f32 = 1500.0;
    pub const SPEED: f32 = 2.0;
    pub const MASS: f32 = 1e12;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomSeed {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SeedStrategy for RandomSeed {
    fn next_body(&mut self, _universe: &Universe) -> Body {
        let theta = self.rng.f32() * TAU;
        let pos = Vec2::new(self.rng.f32() - 0.5, self.rng.f32() - 0.5) * Self::AMPLITUDE;
        let vel = Vec2::new(theta.cos(), theta.sin()) * Self::SPEED;
        Body::new(pos, vel, Self::MASS)
    }
}

/// A disc of bodies on roughly circular orbits around the origin.
#[derive(Debug)]
pub struct GlobularCluster {
    rng: fastrand::Rng,
}

impl GlobularCluster {
    pub const MIN_DISTANCE: f32 = 10.0;
    pub const MAX_DISTANCE: f32 = 600.0;
    pub const MIN_MASS: f32 = 1e12;
    pub const MAX_MASS: f32 = 2e12;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for GlobularCluster {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SeedStrategy for GlobularCluster {
    fn next_body(&mut self, universe: &Universe) -> Body {
        let theta = self.rng.f32() * TAU;
        let distance = range(&mut self.rng, Self::MIN_DISTANCE, Self::MAX_DISTANCE);
        let speed = (universe.gravitational_constant() * Self::MAX_MASS / distance).sqrt();
        let mass = range(&mut self.rng, Self::MIN_MASS, Self::MAX_MASS);

        let (pos, vel) = orbit(theta, distance, speed);
        Body::new(pos, vel, mass)
    }
}

/// A heavy central body first, then a ring of light bodies orbiting it.
#[derive(Debug)]
pub struct PlanetRing {
    rng: fastrand::Rng,
    generated_central_body: bool,
}

impl PlanetRing {
    pub const CENTRAL_MASS: f32 = 1e16;
    pub const MIN_DISTANCE: f32 = 300.0;
    pub const MAX_DISTANCE: f32 = 500.0;
    pub const MIN_MASS: f32 = Self::CENTRAL_MASS / 1e6;
    pub const MAX_MASS: f32 = Self::CENTRAL_MASS / 1e5;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            generated_central_body: false,
        }
    }
}

impl Default for PlanetRing {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SeedStrategy for PlanetRing {
    fn next_body(&mut self, universe: &Universe) -> Body {
        if !self.generated_central_body {
            self.generated_central_body = true;
            return Body::new(Vec2::zero(), Vec2::zero(), Self::CENTRAL_MASS);
        }

        let theta = self.rng.f32() * TAU;
        let distance = range(&mut self.rng, Self::MIN_DISTANCE, Self::MAX_DISTANCE);
        let speed = (universe.gravitational_constant() * Self::CENTRAL_MASS / distance).sqrt();
        let mass = range(&mut self.rng, Self::MIN_MASS, Self::MAX_MASS);

        let (pos, vel) = orbit(theta, distance, speed);
        Body::new(pos, vel, mass)
    }
}

/// Generates `count` bodies split over two galaxies (three quarters and one
/// quarter of the bodies), each a heavy core with a disc in circular orbit.
pub fn galaxy(count: usize, gravitational_constant: f32) -> Vec<Body> {
    let mut rng = fastrand::Rng::with_seed(1);
    let large = count * 3 / 4;

    let mut bodies = Vec::with_capacity(count);
    bodies.extend(galaxy_disc(&mut rng, large, 0.0, 1000.0, 2000.0, gravitational_constant));
    bodies.extend(galaxy_disc(
        &mut rng,
        count - large,
        std::f32::consts::PI,
        4000.0,
        500.0,
        gravitational_constant,
    ));
    bodies
}

fn galaxy_disc(
    rng: &mut fastrand::Rng,
    count: usize,
    direction: f32,
    distance: f32,
    width: f32,
    gravitational_constant: f32,
) -> Vec<Body> {
    const CENTRAL_MASS: f32 = 1e16;
    const CENTRAL_SPEED: f32 = 1.0;
    const MIN_DISTANCE: f32 = 10.0;
    const MIN_MASS: f32 = 1e9;
    const MAX_MASS: f32 = 1e10;

    if count == 0 {
        return Vec::new();
    }

    let (origin, drift) = orbit(direction, distance, CENTRAL_SPEED);
    let mut bodies = Vec::with_capacity(count);
    bodies.push(Body::new(origin, drift, CENTRAL_MASS));

    for _ in 1..count {
        let theta = rng.f32() * TAU;
        let d = range(rng, MIN_DISTANCE, width);
        let speed = (gravitational_constant * CENTRAL_MASS / d).sqrt();
        let mass = range(rng, MIN_MASS, MAX_MASS);

        let (pos, vel) = orbit(theta, d, speed);
        bodies.push(Body::new(origin + pos, drift + vel, mass));
    }

    bodies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UniverseConfig;

    #[test]
    fn strategies_are_deterministic() {
        let universe = Universe::new(100.0, Vec::new()).unwrap();
        let mut a = GlobularCluster::new(7);
        let mut b = GlobularCluster::new(7);

        for _ in 0..10 {
            assert_eq!(a.next_body(&universe), b.next_body(&universe));
        }
    }

    #[test]
    fn planet_ring_starts_with_central_body() {
        let universe = Universe::new(100.0, Vec::new()).unwrap();
        let mut ring = PlanetRing::default();

        let central = ring.next_body(&universe);
        assert_eq!(central.pos, Vec2::zero());
        assert_eq!(central.mass(), PlanetRing::CENTRAL_MASS);

        for _ in 0..50 {
            let body = ring.next_body(&universe);
            let d = body.pos.mag();
            assert!(d >= PlanetRing::MIN_DISTANCE - 1e-2 && d <= PlanetRing::MAX_DISTANCE + 1e-2);
            // Circular orbit: velocity is perpendicular to the radius.
            assert!(body.pos.normalized().dot(body.vel.normalized()).abs() < 1e-3);
        }
    }

    #[test]
    fn random_seed_stays_in_square() {
        let universe = Universe::new(100.0, Vec::new()).unwrap();
        let mut seed = RandomSeed::default();
        let half = RandomSeed::AMPLITUDE / 2.0;

        for _ in 0..100 {
            let body = seed.next_body(&universe);
            assert!(body.pos.x.abs() <= half && body.pos.y.abs() <= half);
            assert!((body.vel.mag() - RandomSeed::SPEED).abs() < 1e-4);
        }
    }

    #[test]
    fn galaxy_splits_bodies() {
        let bodies = galaxy(100, 6.67408e-11);
        assert_eq!(bodies.len(), 100);
        assert_eq!(bodies[0].mass(), 1e16);
        assert_eq!(bodies[75].mass(), 1e16);
        assert!(bodies.iter().all(|b| b.pos.mag() < UniverseConfig::DEFAULT_OUTWARD_BOUND_LIMIT));
    }
}
