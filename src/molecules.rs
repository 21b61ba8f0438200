//! Particle state: positions, diameters, type tags and the bond topology.

use nalgebra::Vector3;

use crate::geometry::Box3;
use crate::topology::BondTable;

/// Owns every per-particle array of the simulation plus the static bond
/// topology. Mutated only through commit operations: an accepted translation
/// rewrites one position (already wrapped) and folds its image flags in, an
/// accepted swap exchanges two particles' diameters and type tags.
#[derive(Debug, Clone)]
pub struct Molecules {
    cell: Box3,
    positions: Vec<Vector3<f64>>,
    diameters: Vec<f64>,
    molecule_types: Vec<i32>,
    particle_types: Vec<i32>,
    image_flags: Vec<Vector3<i32>>,
    bonds: Option<BondTable>,
}

impl Molecules {
    pub fn new(
        cell: Box3,
        positions: Vec<Vector3<f64>>,
        diameters: Vec<f64>,
        molecule_types: Vec<i32>,
        particle_types: Vec<i32>,
        bonds: Option<BondTable>,
    ) -> Self {
        debug_assert_eq!(positions.len(), diameters.len());
        debug_assert_eq!(positions.len(), molecule_types.len());
        debug_assert_eq!(positions.len(), particle_types.len());
        let image_flags = vec![Vector3::new(0, 0, 0); positions.len()];
        Molecules {
            cell,
            positions,
            diameters,
            molecule_types,
            particle_types,
            image_flags,
            bonds,
        }
    }

    pub fn n_particles(&self) -> usize {
        self.positions.len()
    }

    pub fn cell(&self) -> &Box3 {
        &self.cell
    }

    pub fn position(&self, i: usize) -> &Vector3<f64> {
        &self.positions[i]
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn diameter(&self, i: usize) -> f64 {
        self.diameters[i]
    }

    pub fn molecule_type(&self, i: usize) -> i32 {
        self.molecule_types[i]
    }

    pub fn particle_type(&self, i: usize) -> i32 {
        self.particle_types[i]
    }

    pub fn image_flags(&self, i: usize) -> &Vector3<i32> {
        &self.image_flags[i]
    }

    /// Partners bonded to particle `i`; empty in the atomic model.
    pub fn bonded_partners(&self, i: usize) -> &[usize] {
        match &self.bonds {
            Some(bonds) => bonds.partners(i),
            None => &[],
        }
    }

    pub fn has_bonds(&self) -> bool {
        self.bonds.is_some()
    }

    /// Commit an accepted translation: the position must already be wrapped
    /// into `[0, L)` and `flags` is the image increment that wrap reported.
    pub fn commit_position(&mut self, i: usize, position: Vector3<f64>, flags: Vector3<i32>) {
        self.positions[i] = position;
        self.image_flags[i] += flags;
    }

    /// Exchange two particles' diameters and type tags. Calling this twice
    /// restores the original state bit for bit.
    pub fn swap_particles(&mut self, i: usize, j: usize) {
        self.diameters.swap(i, j);
        self.particle_types.swap(i, j);
    }
}
