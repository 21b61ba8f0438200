//! Simulation parameters: YAML file plus command-line overrides.

mod args;

pub use args::Args;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::neighbors::NeighborMethod;
use crate::potentials::BondModel;

/// Which particle model the run simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationModel {
    /// Lennard-Jones fluid, no bonds.
    Atomic,
    /// LJ plus FENE bonds along the loaded topology.
    Polymer,
}

/// Full parameter file for one run.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimConfig {
    pub system: SystemConfig,
    pub potential: PotentialConfig,
    pub neighbors: NeighborConfig,
    pub moves: MoveConfig,
    pub simulation: SimulationConfig,
}

/// Thermodynamic state and particle model.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Number density; the box edge follows as (N / density)^(1/3).
    pub density: f64,
    /// Temperature in reduced units (k_B = 1).
    pub temperature: f64,
    pub model: SimulationModel,
    /// Diameter per particle type tag. Empty means every type has diameter 1.
    #[serde(default)]
    pub diameters: HashMap<i32, f64>,
}

/// Pair and bond interaction parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PotentialConfig {
    /// Reduced interaction cutoff; the pair cutoff is rc^2 sigma^2.
    pub rc: f64,
    /// LJ shift constant. Defaults per model: 0 (atomic), 0.25 (polymer).
    pub lj_shift: Option<f64>,
    /// FENE parameters; required by the polymer model.
    pub fene: Option<FeneConfig>,
    #[serde(default = "default_bond_model")]
    pub bond_model: BondModel,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct FeneConfig {
    /// Nominal maximum bond extension R0.
    pub r0: f64,
    /// Bond stiffness K.
    pub k: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NeighborConfig {
    #[serde(default = "default_neighbor_method")]
    pub method: NeighborMethod,
    /// Skin radius; must exceed the interaction cutoff rc.
    pub r_skin: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MoveConfig {
    /// Maximum single-axis translation.
    pub r_box: f64,
    #[serde(default)]
    pub swap: bool,
    /// Fraction of attempts spent on swap moves when they are enabled.
    #[serde(default = "default_swap_fraction")]
    pub swap_fraction: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulationConfig {
    /// Number of sweeps; each sweep attempts N moves.
    pub time_steps: usize,
    /// Linear cadence of the log-spaced frame schedule.
    #[serde(default = "default_save_update")]
    pub save_update: usize,
    /// Fixed RNG seed; taken from OS entropy when absent.
    pub seed: Option<u64>,
    #[serde(default)]
    pub log_pressure: bool,
}

fn default_bond_model() -> BondModel {
    BondModel::Flexible
}
fn default_neighbor_method() -> NeighborMethod {
    NeighborMethod::Verlet
}
fn default_swap_fraction() -> f64 {
    0.2
}
fn default_save_update() -> usize {
    50
}

impl SimConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).wrap_err_with(|| {
            format!("unable to read parameter file: {}", path.as_ref().display())
        })?;
        let config: SimConfig =
            serde_yaml::from_str(&content).wrap_err("failed to parse parameter file")?;
        config.validate()?;
        Ok(config)
    }

    /// The LJ shift actually used: the configured value or the per-model
    /// default.
    pub fn lj_shift(&self) -> f64 {
        self.potential.lj_shift.unwrap_or(match self.system.model {
            SimulationModel::Atomic => 0.0,
            SimulationModel::Polymer => 0.25,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.system.density <= 0.0 {
            return Err(eyre!("density must be positive"));
        }
        if self.system.temperature <= 0.0 {
            return Err(eyre!("temperature must be positive"));
        }
        if self.potential.rc <= 0.0 {
            return Err(eyre!("interaction cutoff rc must be positive"));
        }
        if self.neighbors.r_skin <= self.potential.rc {
            return Err(eyre!(
                "skin radius ({}) must exceed the interaction cutoff ({})",
                self.neighbors.r_skin,
                self.potential.rc
            ));
        }
        if self.moves.r_box <= 0.0 {
            return Err(eyre!("maximum translation r_box must be positive"));
        }
        if self.moves.swap && !(self.moves.swap_fraction > 0.0 && self.moves.swap_fraction <= 1.0)
        {
            return Err(eyre!("swap_fraction must lie in (0, 1]"));
        }
        if self.simulation.time_steps == 0 {
            return Err(eyre!("time_steps must be positive"));
        }
        if self.simulation.save_update == 0 {
            return Err(eyre!("save_update must be positive"));
        }
        if let Some((_, &diameter)) = self
            .system
            .diameters
            .iter()
            .find(|(_, &diameter)| diameter <= 0.0)
        {
            return Err(eyre!("particle diameters must be positive, got {}", diameter));
        }
        match self.system.model {
            SimulationModel::Polymer => {
                let fene = self
                    .potential
                    .fene
                    .ok_or_else(|| eyre!("the polymer model requires the potential.fene section"))?;
                if fene.r0 <= 0.0 || fene.k <= 0.0 {
                    return Err(eyre!("FENE r0 and k must be positive"));
                }
                if self.simulation.log_pressure {
                    return Err(eyre!("pressure logging is only supported for the atomic model"));
                }
            }
            SimulationModel::Atomic => {
                if self.potential.bond_model == BondModel::Pedersen {
                    return Err(eyre!("the pedersen bond model requires the polymer model"));
                }
            }
        }
        Ok(())
    }

    /// Diameter assigned to one particle type tag.
    pub fn diameter_for(&self, particle_type: i32) -> Result<f64> {
        if self.system.diameters.is_empty() {
            return Ok(1.0);
        }
        self.system
            .diameters
            .get(&particle_type)
            .copied()
            .ok_or_else(|| eyre!("no diameter configured for particle type {}", particle_type))
    }
}
