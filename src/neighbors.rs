//! Verlet neighbor index with a skin region.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::molecules::Molecules;

/// How neighbor candidates are produced for the energy evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborMethod {
    /// Skin-buffered Verlet list, rebuilt on demand.
    Verlet,
    /// Every particle neighbors every other; correctness reference.
    Brute,
}

/// Per-particle neighbor lists keyed by a skin radius larger than the
/// interaction cutoff.
///
/// The lists live in one compressed sparse arena (`offsets` into `entries`)
/// that is reused across rebuilds. Rows are symmetric, never contain the
/// particle itself and stay sorted ascending, which lets the rebuild audit
/// binary-search the previous row the way the list is meant to be checked.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    method: NeighborMethod,
    square_rc: f64,
    square_r_skin: f64,
    /// Rebuild threshold ((r_skin - rc) / 2)^2 on the per-particle
    /// displacement accumulated since the last rebuild.
    square_r_diff: f64,
    offsets: Vec<usize>,
    entries: Vec<usize>,
    prev_offsets: Vec<usize>,
    prev_entries: Vec<usize>,
    pairs: Vec<(usize, usize)>,
    counts: Vec<usize>,
    cursor: Vec<usize>,
    full_range: Vec<usize>,
    errors: u64,
    rebuilds: u64,
    built: bool,
    dirty: bool,
}

impl NeighborTable {
    pub fn new(method: NeighborMethod, rc: f64, r_skin: f64, n_particles: usize) -> Self {
        NeighborTable {
            method,
            square_rc: rc * rc,
            square_r_skin: r_skin * r_skin,
            square_r_diff: (0.5 * (r_skin - rc)).powi(2),
            offsets: vec![0; n_particles + 1],
            entries: Vec::new(),
            prev_offsets: vec![0; n_particles + 1],
            prev_entries: Vec::new(),
            pairs: Vec::new(),
            counts: vec![0; n_particles],
            cursor: vec![0; n_particles],
            full_range: match method {
                NeighborMethod::Verlet => Vec::new(),
                NeighborMethod::Brute => (0..n_particles).collect(),
            },
            errors: 0,
            rebuilds: 0,
            built: false,
            dirty: false,
        }
    }

    pub fn method(&self) -> NeighborMethod {
        self.method
    }

    /// Cumulative count of pairs that entered the interaction cutoff without
    /// having been on the previous list. Nonzero means the skin was too tight
    /// for the move distribution; surfaced at shutdown.
    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// An accepted translation invalidates the clean state until the next
    /// `maybe_rebuild` check.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Neighbor candidates of particle `i`. In brute mode this is the full
    /// index range including `i` itself; the evaluator skips the self index.
    pub fn neighbors_of(&self, i: usize) -> &[usize] {
        match self.method {
            NeighborMethod::Verlet => &self.entries[self.offsets[i]..self.offsets[i + 1]],
            NeighborMethod::Brute => &self.full_range,
        }
    }

    /// Rebuild the lists from scratch over all unordered pairs, auditing the
    /// result against the previous lists. No-op in brute mode.
    pub fn rebuild(&mut self, system: &Molecules) {
        if self.method == NeighborMethod::Brute {
            return;
        }
        let n = system.n_particles();
        self.rebuilds += 1;

        std::mem::swap(&mut self.offsets, &mut self.prev_offsets);
        std::mem::swap(&mut self.entries, &mut self.prev_entries);

        self.pairs.clear();
        for i in 0..n {
            let position_i = system.position(i);
            for j in (i + 1)..n {
                let square_distance = system.cell().square_distance(position_i, system.position(j));
                if square_distance <= self.square_r_skin {
                    self.pairs.push((i, j));
                    // A pair inside the cutoff that the previous list did not
                    // carry was invisible during the last cycle.
                    if self.built
                        && square_distance <= self.square_rc
                        && self.prev_row(i).binary_search(&j).is_err()
                    {
                        self.errors += 1;
                    }
                }
            }
        }

        self.counts.clear();
        self.counts.resize(n, 0);
        for &(i, j) in &self.pairs {
            self.counts[i] += 1;
            self.counts[j] += 1;
        }
        self.offsets.resize(n + 1, 0);
        self.offsets[0] = 0;
        for i in 0..n {
            self.offsets[i + 1] = self.offsets[i] + self.counts[i];
        }

        self.entries.clear();
        self.entries.resize(self.offsets[n], 0);
        self.cursor.clear();
        self.cursor.extend_from_slice(&self.offsets[..n]);
        for &(i, j) in &self.pairs {
            self.entries[self.cursor[i]] = j;
            self.cursor[i] += 1;
            self.entries[self.cursor[j]] = i;
            self.cursor[j] += 1;
        }

        self.built = true;
        self.dirty = false;
        debug!(
            pairs = self.pairs.len(),
            errors = self.errors,
            "neighbor list rebuilt"
        );
    }

    /// Check the skin budget against the displacement accumulated since the
    /// last rebuild and rebuild when some particle exceeded it. Returns true
    /// when a rebuild happened so the caller can zero the accumulators.
    pub fn maybe_rebuild(
        &mut self,
        system: &Molecules,
        inter_displacements: &[Vector3<f64>],
    ) -> bool {
        if self.method == NeighborMethod::Brute {
            return false;
        }
        let max_square = inter_displacements
            .iter()
            .map(|d| d.norm_squared())
            .fold(0.0, f64::max);
        self.dirty = false;
        if max_square > self.square_r_diff {
            self.rebuild(system);
            true
        } else {
            false
        }
    }

    fn prev_row(&self, i: usize) -> &[usize] {
        &self.prev_entries[self.prev_offsets[i]..self.prev_offsets[i + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Box3;

    fn system_with(positions: Vec<Vector3<f64>>, length: f64) -> Molecules {
        let n = positions.len();
        Molecules::new(
            Box3::new(length),
            positions,
            vec![1.0; n],
            vec![0; n],
            vec![0; n],
            None,
        )
    }

    #[test]
    fn test_rows_symmetric_and_self_free() {
        let system = system_with(
            vec![
                Vector3::new(0.5, 0.5, 0.5),
                Vector3::new(2.0, 0.5, 0.5),
                Vector3::new(9.5, 0.5, 0.5),
                Vector3::new(5.0, 5.0, 5.0),
            ],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 4);
        table.rebuild(&system);

        for i in 0..4 {
            assert!(!table.neighbors_of(i).contains(&i));
            for &j in table.neighbors_of(i) {
                assert!(table.neighbors_of(j).contains(&i));
            }
        }
        // Particles 0 and 2 only touch through the periodic boundary.
        assert!(table.neighbors_of(0).contains(&2));
        assert!(table.neighbors_of(3).is_empty());
    }

    #[test]
    fn test_rows_sorted() {
        let system = system_with(
            vec![
                Vector3::new(5.0, 5.0, 5.0),
                Vector3::new(6.0, 5.0, 5.0),
                Vector3::new(4.0, 5.0, 5.0),
                Vector3::new(5.0, 6.0, 5.0),
            ],
            20.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 4);
        table.rebuild(&system);
        for i in 0..4 {
            let row = table.neighbors_of(i);
            assert!(row.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn test_skin_boundary_is_inclusive() {
        let system = system_with(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(3.0, 0.0, 0.0)],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 2);
        table.rebuild(&system);
        assert_eq!(table.neighbors_of(0), &[1]);
    }

    #[test]
    fn test_maybe_rebuild_strict_threshold() {
        // rc = 2, r_skin = 3: the budget is ((3 - 2) / 2)^2 = 0.25 and the
        // boundary case must not trigger.
        let system = system_with(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.5, 0.0, 0.0)],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 2);
        table.rebuild(&system);
        assert_eq!(table.rebuilds(), 1);

        let at_budget = vec![Vector3::new(0.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)];
        assert!(!table.maybe_rebuild(&system, &at_budget));
        assert_eq!(table.rebuilds(), 1);

        let over_budget = vec![Vector3::new(0.51, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)];
        assert!(table.maybe_rebuild(&system, &over_budget));
        assert_eq!(table.rebuilds(), 2);
    }

    #[test]
    fn test_audit_counts_missed_pairs() {
        let mut system = system_with(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(5.0, 0.0, 0.0)],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 2.5, 2);
        table.rebuild(&system);
        assert_eq!(table.errors(), 0);

        // Teleport particle 1 inside the cutoff without any rebuild in
        // between: the pair was invisible for a whole cycle.
        system.commit_position(1, Vector3::new(1.0, 0.0, 0.0), Vector3::new(0, 0, 0));
        table.rebuild(&system);
        assert_eq!(table.errors(), 1);

        // A further rebuild without motion reports nothing new.
        table.rebuild(&system);
        assert_eq!(table.errors(), 1);
    }

    #[test]
    fn test_first_build_never_audits() {
        let system = system_with(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 2);
        table.rebuild(&system);
        assert_eq!(table.errors(), 0);
    }

    #[test]
    fn test_brute_mode_full_range() {
        let system = system_with(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(5.0, 5.0, 5.0),
                Vector3::new(9.0, 9.0, 9.0),
            ],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Brute, 2.0, 3.0, 3);
        table.rebuild(&system);
        assert_eq!(table.neighbors_of(1), &[0, 1, 2]);
        assert_eq!(table.rebuilds(), 0);
        assert!(!table.maybe_rebuild(&system, &[Vector3::new(9.0, 9.0, 9.0); 3]));
    }

    #[test]
    fn test_dirty_state_round_trip() {
        let system = system_with(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.5, 0.0, 0.0)],
            10.0,
        );
        let mut table = NeighborTable::new(NeighborMethod::Verlet, 2.0, 3.0, 2);
        table.rebuild(&system);
        assert!(!table.is_dirty());
        table.mark_dirty();
        assert!(table.is_dirty());
        table.maybe_rebuild(&system, &[Vector3::new(0.0, 0.0, 0.0); 2]);
        assert!(!table.is_dirty());
    }
}
