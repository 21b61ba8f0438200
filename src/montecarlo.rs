//! Metropolis Monte Carlo engine.

use color_eyre::eyre::{bail, Result};
use itertools::izip;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;

use crate::energy::Interactions;
use crate::molecules::Molecules;
use crate::neighbors::NeighborTable;
use crate::output::RunRecorder;

/// Knobs of the move loop.
#[derive(Debug, Clone, Copy)]
pub struct RunParameters {
    /// Temperature in reduced units, k_B = 1.
    pub temperature: f64,
    /// Maximum single-axis translation.
    pub r_box: f64,
    /// Number of sweeps; every sweep attempts N moves.
    pub time_steps: usize,
    /// Probability that an attempt is a swap instead of a translation.
    /// `None` disables swap moves.
    pub swap_fraction: Option<f64>,
    /// Maintain the virial and log the pressure once per sweep.
    pub log_pressure: bool,
}

/// Acceptance bookkeeping. Accepted moves accumulate 1/N, so the raw totals
/// read as per-sweep counts until the final normalization over time steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveStatistics {
    translation_accepted: f64,
    swap_accepted: f64,
}

impl MoveStatistics {
    pub fn translation_rate(&self, time_steps: usize) -> f64 {
        self.translation_accepted / time_steps as f64
    }

    /// The swap rate is further normalized by the fraction of attempts that
    /// were swaps at all.
    pub fn swap_rate(&self, time_steps: usize, swap_fraction: f64) -> f64 {
        self.swap_accepted / time_steps as f64 / swap_fraction
    }
}

/// Drives the simulation: selects moves, applies the Metropolis rule, commits
/// or rolls back particle state and keeps the running energy, displacement
/// accumulators and neighbor table consistent with each other.
pub struct MonteCarlo {
    system: Molecules,
    interactions: Interactions,
    neighbors: NeighborTable,
    params: RunParameters,
    rng: StdRng,
    energy: f64,
    virial: f64,
    /// Motion within the current sweep, since the last neighbor rebuild and
    /// since the start of the run.
    step_displacements: Vec<Vector3<f64>>,
    inter_displacements: Vec<Vector3<f64>>,
    total_displacements: Vec<Vector3<f64>>,
    stats: MoveStatistics,
}

impl MonteCarlo {
    /// Build the engine, run the initial neighbor construction and compute
    /// the starting energy (and virial when pressure logging is on).
    pub fn new(
        system: Molecules,
        interactions: Interactions,
        mut neighbors: NeighborTable,
        params: RunParameters,
        rng: StdRng,
    ) -> Result<Self> {
        let n = system.n_particles();
        if params.swap_fraction.is_some() && n % 3 != 0 {
            bail!(
                "swap moves assume complete trimers, got {} particles",
                n
            );
        }
        if params.log_pressure && interactions.bonded.is_some() {
            bail!("pressure logging is only supported for the atomic model");
        }
        neighbors.rebuild(&system);
        let energy = interactions.system_energy(&system, &neighbors);
        let virial = if params.log_pressure {
            interactions.system_virial(&system, &neighbors)
        } else {
            0.0
        };
        Ok(MonteCarlo {
            system,
            interactions,
            neighbors,
            params,
            rng,
            energy,
            virial,
            step_displacements: vec![Vector3::zeros(); n],
            inter_displacements: vec![Vector3::zeros(); n],
            total_displacements: vec![Vector3::zeros(); n],
            stats: MoveStatistics::default(),
        })
    }

    pub fn system(&self) -> &Molecules {
        &self.system
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn statistics(&self) -> &MoveStatistics {
        &self.stats
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn energy_per_particle(&self) -> f64 {
        self.energy / self.system.n_particles() as f64
    }

    /// From-scratch recomputation of the running energy; the two agree to
    /// floating-point accumulation error after every committed move.
    pub fn recomputed_energy(&self) -> f64 {
        self.interactions.system_energy(&self.system, &self.neighbors)
    }

    /// Instantaneous pressure P = rho T + W / (3V), available when pressure
    /// logging is enabled.
    pub fn pressure(&self) -> Option<f64> {
        if !self.params.log_pressure {
            return None;
        }
        let volume = self.system.cell().volume();
        let density = self.system.n_particles() as f64 / volume;
        Some(density * self.params.temperature + self.virial / (3.0 * volume))
    }

    /// The outer loop: `time_steps` sweeps of N attempts each. After every
    /// sweep the per-sweep displacements are folded into the rebuild and
    /// lifetime accumulators and the neighbor skin budget is checked.
    pub fn run(&mut self, recorder: &mut RunRecorder) -> Result<()> {
        let n = self.system.n_particles();
        recorder.record_initial(
            &self.system,
            self.energy_per_particle(),
            &self.total_displacements,
        )?;

        for step in 0..self.params.time_steps {
            for _ in 0..n {
                self.mc_move();
            }
            self.end_of_sweep();
            recorder.record_sweep(
                step,
                &self.system,
                &self.total_displacements,
                self.energy_per_particle(),
                self.pressure(),
            )?;
            debug_assert!(self.energy.is_finite());
        }

        recorder.record_final(&self.system, &self.total_displacements, self.neighbors.errors())?;
        self.report_summary();
        Ok(())
    }

    fn end_of_sweep(&mut self) {
        for (step_d, inter, total) in izip!(
            &mut self.step_displacements,
            &mut self.inter_displacements,
            &mut self.total_displacements
        ) {
            *inter += *step_d;
            *total += *step_d;
            *step_d = Vector3::zeros();
        }
        if self
            .neighbors
            .maybe_rebuild(&self.system, &self.inter_displacements)
        {
            for displacement in &mut self.inter_displacements {
                *displacement = Vector3::zeros();
            }
        }
    }

    fn report_summary(&self) {
        let steps = self.params.time_steps;
        info!(
            "translation acceptance rate: {:.6}",
            self.stats.translation_rate(steps)
        );
        if let Some(fraction) = self.params.swap_fraction {
            info!(
                "swap acceptance rate: {:.6}",
                self.stats.swap_rate(steps, fraction)
            );
        }
        info!(
            "neighbor list update rate: {:.6}",
            self.neighbors.rebuilds() as f64 / steps as f64
        );
        info!("neighbor list errors: {}", self.neighbors.errors());
    }

    fn mc_move(&mut self) {
        if let Some(fraction) = self.params.swap_fraction {
            if self.rng.gen::<f64>() < fraction {
                self.mc_swap();
                return;
            }
        }
        self.mc_translation();
    }

    /// Translate one random particle by a uniform displacement in
    /// [-r_box, r_box]^3 and accept or reject the wrapped trial position.
    fn mc_translation(&mut self) {
        let n = self.system.n_particles();
        let index = self.rng.gen_range(0..n);
        let delta = Vector3::new(
            self.rng.gen_range(-self.params.r_box..self.params.r_box),
            self.rng.gen_range(-self.params.r_box..self.params.r_box),
            self.rng.gen_range(-self.params.r_box..self.params.r_box),
        );
        let (new_position, flags) = self
            .system
            .cell()
            .wrap(&(self.system.position(index) + delta));

        let diff_energy = {
            let neighbors = self.neighbors.neighbors_of(index);
            let old_energy = self.interactions.particle_energy(
                &self.system,
                index,
                self.system.position(index),
                neighbors,
                None,
            );
            let new_energy =
                self.interactions
                    .particle_energy(&self.system, index, &new_position, neighbors, None);
            new_energy - old_energy
        };

        if self.metropolis(diff_energy) {
            if self.params.log_pressure {
                let neighbors = self.neighbors.neighbors_of(index);
                let new_virial = self.interactions.particle_virial(
                    &self.system,
                    index,
                    &new_position,
                    neighbors,
                    None,
                );
                let old_virial = self.interactions.particle_virial(
                    &self.system,
                    index,
                    self.system.position(index),
                    neighbors,
                    None,
                );
                self.virial += new_virial - old_virial;
            }
            self.system.commit_position(index, new_position, flags);
            self.step_displacements[index] += delta;
            self.energy += diff_energy;
            self.stats.translation_accepted += 1.0 / n as f64;
            self.neighbors.mark_dirty();
        }
    }

    /// Exchange the diameters of a trimer's end particles. The two states are
    /// evaluated under their own diameters with an explicit swap in between;
    /// rejection swaps back.
    fn mc_swap(&mut self) {
        let n = self.system.n_particles();
        let first = {
            let drawn = self.rng.gen_range(0..n);
            drawn - drawn % 3
        };
        let second = first + 2;

        let (old_energy, old_virial) = self.swap_state_terms(first, second);
        self.system.swap_particles(first, second);
        let (new_energy, new_virial) = self.swap_state_terms(first, second);
        let diff_energy = new_energy - old_energy;

        if self.metropolis(diff_energy) {
            self.energy += diff_energy;
            self.virial += new_virial - old_virial;
            self.stats.swap_accepted += 1.0 / n as f64;
        } else {
            self.system.swap_particles(first, second);
        }
    }

    /// Energy (and virial, when tracked) of a swap pair under the diameters
    /// currently committed. Each side uses its own neighbor row and skips the
    /// partner so the shared pair is not counted from both sides.
    fn swap_state_terms(&self, first: usize, second: usize) -> (f64, f64) {
        let energy_first = self.interactions.particle_energy(
            &self.system,
            first,
            self.system.position(first),
            self.neighbors.neighbors_of(first),
            Some(second),
        );
        let energy_second = self.interactions.particle_energy(
            &self.system,
            second,
            self.system.position(second),
            self.neighbors.neighbors_of(second),
            Some(first),
        );
        let virial = if self.params.log_pressure {
            self.interactions.particle_virial(
                &self.system,
                first,
                self.system.position(first),
                self.neighbors.neighbors_of(first),
                Some(second),
            ) + self.interactions.particle_virial(
                &self.system,
                second,
                self.system.position(second),
                self.neighbors.neighbors_of(second),
                Some(first),
            )
        } else {
            0.0
        };
        (energy_first + energy_second, virial)
    }

    /// Metropolis acceptance: always take downhill moves, otherwise accept
    /// with probability exp(-dE / T). An infinite dE (broken FENE bond) makes
    /// the threshold zero and the move is rejected, never an error.
    fn metropolis(&mut self, diff_energy: f64) -> bool {
        if diff_energy < 0.0 {
            return true;
        }
        let threshold = (-diff_energy / self.params.temperature).exp();
        threshold > self.rng.gen::<f64>()
    }
}
