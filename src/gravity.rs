use crate::{body::Body, quadtree::VirtualBody};
use ultraviolet::Vec2;

/// Newtonian attraction between point masses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gravity {
    /// Gravitational constant.
    pub constant: f32,
    /// Softening length added in quadrature to the distance (0 disables it).
    pub softening: f32,
}

impl Gravity {
    pub const G: f32 = 6.67408e-11;

    pub fn new(constant: f32, softening: f32) -> Self {
        Self {
            constant,
            softening,
        }
    }

    /// Force pulling a mass at `pos` toward `other`:
    /// `G * m_a * m_b / (d^2 + s^2)` along the unit vector from `pos` to `other`.
    /// Coincident masses have no direction and contribute nothing, and neither
    /// do pairs so close that the magnitude overflows; such pairs overlap
    /// and are merged in the same tick.
    #[inline(always)]
    pub fn attraction(&self, pos: Vec2, mass: f32, other: &VirtualBody) -> Vec2 {
        let d = other.pos - pos;
        let d_sq = d.mag_sq();
        if d_sq == 0.0 {
            return Vec2::zero();
        }

        let magnitude = self.constant * mass * other.mass / (d_sq + self.softening * self.softening);
        if !magnitude.is_finite() {
            return Vec2::zero();
        }
        d / d_sq.sqrt() * magnitude
    }

    /// Sum of the attractions of every virtual body on `body`.
    pub fn net_force(&self, body: &Body, virtual_bodies: &[VirtualBody]) -> Vec2 {
        virtual_bodies
            .iter()
            .fold(Vec2::zero(), |force, other| force + self.attraction(body.pos, body.mass(), other))
    }

    /// Exact pairwise forces on every body, visiting each pair once.
    pub fn pairwise(&self, bodies: &[Body]) -> Vec<Vec2> {
        let mut forces = vec![Vec2::zero(); bodies.len()];

        for i in 0..bodies.len() {
            for j in i + 1..bodies.len() {
                let a = &bodies[i];
                let force = self.attraction(a.pos, a.mass(), &VirtualBody::from_body(&bodies[j]));
                forces[i] += force;
                forces[j] -= force;
            }
        }

        forces
    }
}

impl Default for Gravity {
    fn default() -> Self {
        Self::new(Self::G, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn virtual_at(x: f32, y: f32, mass: f32) -> VirtualBody {
        VirtualBody {
            pos: Vec2::new(x, y),
            mass,
        }
    }

    #[test]
    fn attraction_points_toward_other_mass() {
        let gravity = Gravity::new(1.0, 0.0);
        let force = gravity.attraction(Vec2::zero(), 2.0, &virtual_at(0.0, 2.0, 3.0));

        assert!(force.x.abs() < 1e-6);
        assert!((force.y - 1.5).abs() < 1e-6);
    }

    #[test]
    fn inverse_square_law() {
        let gravity = Gravity::default();
        let near = gravity.attraction(Vec2::zero(), 1e12, &virtual_at(1.0, 0.0, 1e12)).mag();
        let far = gravity.attraction(Vec2::zero(), 1e12, &virtual_at(2.0, 0.0, 1e12)).mag();

        assert!((near / far - 4.0).abs() < 1e-3, "expected ~4x, got {}", near / far);
    }

    #[test]
    fn coincident_masses_contribute_nothing() {
        let gravity = Gravity::default();
        let force = gravity.attraction(Vec2::new(3.0, 4.0), 1.0, &virtual_at(3.0, 4.0, 1.0));
        assert_eq!(force, Vec2::zero());
    }

    #[test]
    fn overflowing_attraction_contributes_nothing() {
        let gravity = Gravity::default();
        let force = gravity.attraction(Vec2::zero(), 1e12, &virtual_at(1e-15, 0.0, 1e12));
        assert_eq!(force, Vec2::zero());

        // Huge but finite magnitudes keep a finite direction.
        let force = gravity.attraction(Vec2::zero(), 1e12, &virtual_at(1e-12, 0.0, 1e12));
        assert!(force.x.is_finite() && force.x > 0.0);
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn softening_bounds_close_encounters() {
        let soft = Gravity::new(1.0, 0.1);
        let force = soft.attraction(Vec2::zero(), 1.0, &virtual_at(1e-6, 0.0, 1.0));
        assert!(force.mag() < 101.0);
    }

    #[test]
    fn pairwise_forces_cancel() {
        let gravity = Gravity::new(1.0, 0.0);
        let bodies = vec![
            Body::new(Vec2::new(-1.0, 0.0), Vec2::zero(), 2.0),
            Body::new(Vec2::new(1.0, 0.5), Vec2::zero(), 3.0),
            Body::new(Vec2::new(0.0, 2.0), Vec2::zero(), 5.0),
        ];

        let net = gravity.pairwise(&bodies).into_iter().fold(Vec2::zero(), |acc, f| acc + f);
        assert!(net.mag() < 1e-5, "net force not zero: {:?}", net);
    }
}
