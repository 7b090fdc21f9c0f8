//! Simulation parameters, loadable from YAML.
//!
//! ```yaml
//! computations_per_second: 100.0
//! gravitational_constant: 6.67408e-11
//! outward_bound_limit: 10000.0
//! theta: 0.25
//! leaf_capacity: 4
//! softening: 0.0
//! force_method: barnes_hut   # or direct_sum
//! parallel: false
//! ```
//!
//! Every field is optional and falls back to [`UniverseConfig::default`].

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{gravity::Gravity, quadtree::Quadtree};

/// How forces between bodies are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceMethod {
    /// Barnes-Hut approximation over the quadtree, controlled by `theta`.
    #[default]
    BarnesHut,
    /// Exact summation over every pair.
    DirectSum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UniverseConfig {
    /// Ticks per simulated second.
    pub computations_per_second: f32,
    pub gravitational_constant: f32,
    /// Bodies farther than this from the origin are removed.
    pub outward_bound_limit: f32,
    /// Opening angle. Smaller is more accurate and slower.
    pub theta: f32,
    /// Bodies per quadtree leaf before it subdivides.
    pub leaf_capacity: usize,
    /// Softening length (0 keeps the plain inverse-square law).
    pub softening: f32,
    pub force_method: ForceMethod,
    /// Run the Barnes-Hut force queries on the rayon thread pool.
    pub parallel: bool,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            computations_per_second: Self::DEFAULT_COMPUTATIONS_PER_SECOND,
            gravitational_constant: Gravity::G,
            outward_bound_limit: Self::DEFAULT_OUTWARD_BOUND_LIMIT,
            theta: Self::DEFAULT_THETA,
            leaf_capacity: Quadtree::DEFAULT_LEAF_CAPACITY,
            softening: 0.0,
            force_method: ForceMethod::BarnesHut,
            parallel: false,
        }
    }
}

impl UniverseConfig {
    /// Default constants.
    pub const DEFAULT_COMPUTATIONS_PER_SECOND: f32 = 100.0;
    pub const DEFAULT_OUTWARD_BOUND_LIMIT: f32 = 10_000.0;
    pub const DEFAULT_THETA: f32 = 0.25;

    pub fn with_computations_per_second(computations_per_second: f32) -> Self {
        Self {
            computations_per_second,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid universe configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid universe configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.computations_per_second.is_finite() && self.computations_per_second > 0.0,
            "computations_per_second must be positive, got {}",
            self.computations_per_second
        );
        ensure!(
            self.gravitational_constant.is_finite(),
            "gravitational_constant must be finite, got {}",
            self.gravitational_constant
        );
        ensure!(
            self.outward_bound_limit.is_finite() && self.outward_bound_limit > 0.0,
            "outward_bound_limit must be positive, got {}",
            self.outward_bound_limit
        );
        ensure!(
            self.theta.is_finite() && self.theta >= 0.0,
            "theta must be non-negative, got {}",
            self.theta
        );
        ensure!(self.leaf_capacity >= 1, "leaf_capacity must be at least 1");
        ensure!(
            self.softening.is_finite() && self.softening >= 0.0,
            "softening must be non-negative, got {}",
            self.softening
        );
        Ok(())
    }

    /// Length of one tick in simulated seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.computations_per_second
    }

    pub fn gravity(&self) -> Gravity {
        Gravity::new(self.gravitational_constant, self.softening)
    }
}
