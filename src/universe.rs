use crate::{
    body::Body,
    collision,
    config::{ForceMethod, UniverseConfig},
    quadtree::Quadtree,
    seed::SeedStrategy,
};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, trace, warn};
use ultraviolet::Vec2;

/// Owns the bodies and advances them one fixed time step per [`Universe::tick`].
///
/// A tick prunes bodies beyond the outward bound, builds a Barnes-Hut
/// quadtree, computes forces, integrates with semi-implicit Euler, rebuilds
/// the tree on the new positions and merges overlapping bodies.
/// Bodies are processed in collection order, so a run is reproducible for a
/// given initial population and configuration.
#[derive(Debug)]
pub struct Universe {
    config: UniverseConfig,
    /// Collection of all bodies in the simulation.
    bodies: Vec<Body>,
    computed_ticks: u64,
    /// Scratch tree, cleared and refilled on every build.
    tree: Quadtree,
}

impl Universe {
    /// Creates a universe with the default configuration and the given tick rate.
    pub fn new(computations_per_second: f32, bodies: Vec<Body>) -> Result<Self> {
        Self::with_config(UniverseConfig::with_computations_per_second(computations_per_second), bodies)
    }

    pub fn with_config(config: UniverseConfig, bodies: Vec<Body>) -> Result<Self> {
        config.validate()?;
        let tree = Quadtree::new(config.leaf_capacity);
        Ok(Self {
            config,
            bodies,
            computed_ticks: 0,
            tree,
        })
    }

    /// Populates a new universe with `count` bodies drawn from `strategy`.
    pub fn from_seed(config: UniverseConfig, count: usize, strategy: &mut impl SeedStrategy) -> Result<Self> {
        let mut universe = Self::with_config(config, Vec::with_capacity(count))?;
        for _ in 0..count {
            let body = strategy.next_body(&universe);
            universe.bodies.push(body);
        }
        debug!(count, "seeded universe");
        Ok(universe)
    }

    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn add_body(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn computed_ticks(&self) -> u64 {
        self.computed_ticks
    }

    pub fn computations_per_second(&self) -> f32 {
        self.config.computations_per_second
    }

    /// Elapsed simulated seconds.
    pub fn duration(&self) -> f32 {
        self.computed_ticks as f32 / self.config.computations_per_second
    }

    pub fn gravitational_constant(&self) -> f32 {
        self.config.gravitational_constant
    }

    pub fn outward_bound_limit(&self) -> f32 {
        self.config.outward_bound_limit
    }

    pub fn total_mass(&self) -> f32 {
        self.bodies.iter().map(Body::mass).sum()
    }

    /// Advances the simulation by one time step.
    ///
    /// Fails only if a body escapes the tree boundary computed for it, which
    /// means the bounding box logic is broken; the universe must not be
    /// ticked again after an error.
    pub fn tick(&mut self) -> Result<()> {
        self.prune();
        let forces = self.compute_forces()?;
        let max_radius = self.integrate(&forces);
        self.collide(max_radius)?;

        self.computed_ticks += 1;
        trace!(
            tick = self.computed_ticks,
            bodies = self.bodies.len(),
            nodes = self.tree.node_count(),
            "tick computed"
        );
        Ok(())
    }

    /// Removes every body farther from the origin than the outward bound,
    /// along with bodies that have no positive finite mass.
    fn prune(&mut self) {
        let limit = self.config.outward_bound_limit;
        let before = self.bodies.len();
        self.bodies
            .retain(|body| body.pos.mag() <= limit && body.mass().is_finite() && body.mass() > 0.0);

        let pruned = before - self.bodies.len();
        if pruned > 0 {
            debug!(pruned, remaining = self.bodies.len(), "pruned out of bound bodies");
        }
    }

    /// Calculates the net gravitational force on every body.
    fn compute_forces(&mut self) -> Result<Vec<Vec2>> {
        let gravity = self.config.gravity();

        let forces = match self.config.force_method {
            ForceMethod::DirectSum => gravity.pairwise(&self.bodies),
            ForceMethod::BarnesHut => {
                self.tree.build(&self.bodies)?;

                let theta = self.config.theta;
                let tree = &self.tree;
                let bodies = &self.bodies;
                let force_on = |i: usize| {
                    let virtual_bodies = tree.approximate_force_query(bodies, i, theta);
                    gravity.net_force(&bodies[i], &virtual_bodies)
                };

                // The tree is read-only here, so bodies can be processed in parallel.
                if self.config.parallel {
                    (0..bodies.len()).into_par_iter().map(force_on).collect()
                } else {
                    (0..bodies.len()).map(force_on).collect()
                }
            }
        };

        for (index, force) in forces.iter().enumerate() {
            if !(force.x.is_finite() && force.y.is_finite()) {
                warn!(index, ?force, pos = ?self.bodies[index].pos, "non-finite force");
            }
        }

        Ok(forces)
    }

    /// Applies the forces for one tick and returns the largest body radius.
    /// Bodies whose state stops being finite are dropped so the collision
    /// tree can still bound the rest.
    fn integrate(&mut self, forces: &[Vec2]) -> f32 {
        let dt = self.config.dt();
        for (body, &force) in self.bodies.iter_mut().zip(forces) {
            body.apply_force(force, dt);
        }

        let before = self.bodies.len();
        self.bodies.retain(Body::is_finite);
        let dropped = before - self.bodies.len();
        if dropped > 0 {
            warn!(dropped, remaining = self.bodies.len(), "dropped bodies with non-finite state");
        }

        self.bodies.iter().map(Body::radius).fold(0.0, f32::max)
    }

    /// Merges overlapping bodies, searching candidates in a tree rebuilt on
    /// the integrated positions.
    fn collide(&mut self, max_radius: f32) -> Result<()> {
        self.tree.build(&self.bodies)?;

        let groups = collision::find_groups(&self.bodies, &self.tree, max_radius);
        if groups.is_empty() {
            return Ok(());
        }

        let absorbed = collision::resolve(&mut self.bodies, &groups);
        debug!(groups = groups.len(), absorbed, "merged colliding bodies");
        Ok(())
    }
}
