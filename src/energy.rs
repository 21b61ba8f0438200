//! Local and system energy evaluation.

use nalgebra::Vector3;

use crate::molecules::Molecules;
use crate::neighbors::NeighborTable;
use crate::potentials::{
    fene_energy, is_trimer_end_pair, lj_energy, lj_virial, pedersen_energy, BondModel,
};

/// Bond parameters of the polymeric model.
#[derive(Debug, Clone, Copy)]
pub struct BondedInteractions {
    pub square_r0: f64,
    pub fene_k: f64,
    pub bond_model: BondModel,
}

/// Interaction parameters shared by every energy evaluation. The atomic model
/// carries only the LJ cutoff and shift; the polymeric model adds the bonded
/// terms.
#[derive(Debug, Clone, Copy)]
pub struct Interactions {
    pub square_rc: f64,
    pub lj_shift: f64,
    pub bonded: Option<BondedInteractions>,
}

impl Interactions {
    pub fn atomic(rc: f64, lj_shift: f64) -> Self {
        Interactions {
            square_rc: rc * rc,
            lj_shift,
            bonded: None,
        }
    }

    pub fn polymer(rc: f64, lj_shift: f64, r0: f64, fene_k: f64, bond_model: BondModel) -> Self {
        Interactions {
            square_rc: rc * rc,
            lj_shift,
            bonded: Some(BondedInteractions {
                square_r0: r0 * r0,
                fene_k,
                bond_model,
            }),
        }
    }

    /// Energy of particle `index` held at `position` against the current
    /// positions of everything else.
    ///
    /// `neighbors` is the particle's candidate row (its own index is skipped,
    /// so brute-mode full ranges work unchanged). `skip` drops one extra
    /// partner: during a swap evaluation the partner's terms must not be
    /// counted from both sides. In the polymeric model the bonded partners
    /// contribute on top of the non-bonded loop.
    pub fn particle_energy(
        &self,
        system: &Molecules,
        index: usize,
        position: &Vector3<f64>,
        neighbors: &[usize],
        skip: Option<usize>,
    ) -> f64 {
        let sigma_i = system.diameter(index);
        let mut energy = 0.0;

        for &j in neighbors {
            if j == index || Some(j) == skip {
                continue;
            }
            let square_distance = system.cell().square_distance(position, system.position(j));
            energy += lj_energy(
                square_distance,
                sigma_i,
                system.diameter(j),
                self.square_rc,
                self.lj_shift,
            );
        }

        if let Some(bonded) = &self.bonded {
            for &j in system.bonded_partners(index) {
                if j == index || Some(j) == skip {
                    continue;
                }
                let square_distance = system.cell().square_distance(position, system.position(j));
                energy += self.bond_energy(bonded, square_distance, index, j, sigma_i, system);
            }
        }

        energy
    }

    fn bond_energy(
        &self,
        bonded: &BondedInteractions,
        square_distance: f64,
        i: usize,
        j: usize,
        sigma_i: f64,
        system: &Molecules,
    ) -> f64 {
        let sigma_j = system.diameter(j);
        match bonded.bond_model {
            BondModel::Pedersen if is_trimer_end_pair(i, j) => pedersen_energy(
                square_distance,
                sigma_i,
                sigma_j,
                self.square_rc,
                self.lj_shift,
                bonded.square_r0,
                bonded.fene_k,
            ),
            _ => fene_energy(
                square_distance,
                sigma_i,
                sigma_j,
                bonded.square_r0,
                bonded.fene_k,
            ),
        }
    }

    /// Total system energy, halving the per-particle sums because symmetric
    /// neighbor rows count every pair twice.
    pub fn system_energy(&self, system: &Molecules, neighbors: &NeighborTable) -> f64 {
        let mut energy = 0.0;
        for i in 0..system.n_particles() {
            energy += 0.5
                * self.particle_energy(
                    system,
                    i,
                    system.position(i),
                    neighbors.neighbors_of(i),
                    None,
                );
        }
        energy
    }

    /// LJ virial sum of one particle, the configurational ingredient of the
    /// pressure. Bond terms carry no virial here; pressure logging is an
    /// atomic-model feature.
    pub fn particle_virial(
        &self,
        system: &Molecules,
        index: usize,
        position: &Vector3<f64>,
        neighbors: &[usize],
        skip: Option<usize>,
    ) -> f64 {
        let sigma_i = system.diameter(index);
        let mut virial = 0.0;
        for &j in neighbors {
            if j == index || Some(j) == skip {
                continue;
            }
            let square_distance = system.cell().square_distance(position, system.position(j));
            virial += lj_virial(square_distance, sigma_i, system.diameter(j), self.square_rc);
        }
        virial
    }

    pub fn system_virial(&self, system: &Molecules, neighbors: &NeighborTable) -> f64 {
        let mut virial = 0.0;
        for i in 0..system.n_particles() {
            virial += 0.5
                * self.particle_virial(
                    system,
                    i,
                    system.position(i),
                    neighbors.neighbors_of(i),
                    None,
                );
        }
        virial
    }
}
