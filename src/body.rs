use std::f32::consts::PI;

use ultraviolet::Vec2;

/// Represents a point mass in the simulation.
///
/// The radius is derived from the mass and is recomputed whenever the mass
/// changes, so the mass is only writable through [`Body::set_mass`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Position vector.
    pub pos: Vec2,
    /// Velocity vector.
    pub vel: Vec2,
    /// Acceleration vector (overwritten each tick).
    pub acc: Vec2,
    mass: f32,
    radius: f32,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(Vec2::zero(), Vec2::zero(), 1.0)
    }
}

impl Body {
    /// Scale between the radius of a unit-density sphere and the simulated radius.
    pub const RADIUS_SCALE: f32 = 5000.0;

    /// Creates a new Body at rest acceleration-wise.
    pub fn new(pos: Vec2, vel: Vec2, mass: f32) -> Self {
        Self::with_acceleration(pos, vel, Vec2::zero(), mass)
    }

    pub fn with_acceleration(pos: Vec2, vel: Vec2, acc: Vec2, mass: f32) -> Self {
        Self {
            pos,
            vel,
            acc,
            mass,
            radius: Self::radius_for(mass),
        }
    }

    /// Radius of a body of the given mass: `cbrt(3/4 * m / pi) / 5000`.
    pub fn radius_for(mass: f32) -> f32 {
        (0.75 * mass / PI).cbrt() / Self::RADIUS_SCALE
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.radius = Self::radius_for(mass);
    }

    /// Momentum of the body.
    pub fn momentum(&self) -> Vec2 {
        self.vel * self.mass
    }

    /// Applies a net force for one step of length `dt`.
    /// Uses semi-implicit Euler integration (velocity update first, then position).
    pub fn apply_force(&mut self, force: Vec2, dt: f32) {
        self.acc = force / self.mass;
        self.vel += self.acc * dt;
        self.pos += self.vel * dt;
    }

    /// Position, velocity and acceleration are all finite.
    pub fn is_finite(&self) -> bool {
        [self.pos, self.vel, self.acc].iter().all(|v| v.x.is_finite() && v.y.is_finite())
    }

    /// Returns true if the two bodies overlap.
    pub fn overlaps(&self, other: &Body) -> bool {
        (other.pos - self.pos).mag() < self.radius + other.radius
    }
}
